//! Session listing. The gateway owns session state; nothing is read from
//! local files.

pub const SOURCE_OF_TRUTH_WARNINGS: &[&str] = &[
    "The Gateway is the source of truth for session state.",
    "Sessions cannot be inferred from local files.",
];

pub fn list_tokens() -> Vec<String> {
    ["sessions", "list", "--json"].map(String::from).to_vec()
}
