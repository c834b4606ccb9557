//! Whole-profile tests against realistic bundle excerpts.

mod profiles;
