use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL: Regex =
        Regex::new(r"(?i)[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}").expect("email pattern is valid");
    // Bank account and card numbers: long digit runs, optionally grouped by spaces or dashes.
    static ref ACCOUNT_NUMBER: Regex =
        Regex::new(r"\b(?:\d[ -]?){5,}(\d{4})\b").expect("account pattern is valid");
}

/// Strips applicant contact and account details from text bound for the logs.
///
/// Emails are replaced outright; account numbers keep their last four digits.
pub fn redact(input: &str) -> Cow<'_, str> {
    let masked = EMAIL.replace_all(input, "***@***.***");
    if ACCOUNT_NUMBER.is_match(&masked) {
        Cow::Owned(ACCOUNT_NUMBER.replace_all(&masked, "****$1").into_owned())
    } else {
        masked
    }
}
