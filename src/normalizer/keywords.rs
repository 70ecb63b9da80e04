//! Static keyword tables used by the title normalizer.

/// Bracketed content containing any of these (case-insensitive) is a format token.
pub const FORMAT_KEYWORDS: &[&str] = &[
    "vinyl",
    "lp",
    "ep",
    "7\"",
    "10\"",
    "12\"",
    "single",
    "double lp",
    "2lp",
    "2xlp",
    "3lp",
    "picture disc",
    "colored vinyl",
    "clear vinyl",
];

/// Parenthesised content containing any of these (case-insensitive) describes a pressing variant.
pub const DESCRIPTOR_KEYWORDS: &[&str] = &[
    "colored",
    "clear",
    "transparent",
    "opaque",
    "splatter",
    "marble",
    "swirl",
    "smoke",
    "red vinyl",
    "blue vinyl",
    "green vinyl",
    "yellow vinyl",
    "white vinyl",
    "black vinyl",
    "pink vinyl",
    "purple vinyl",
    "orange vinyl",
    "gold vinyl",
    "silver vinyl",
    "limited to",
    "ltd",
    "/500",
    "/1000",
    "/300",
    "180g",
    "140g",
    "gram",
    "heavyweight",
];

/// Keyword (lowercase substring) to canonical genre tag.
pub const GENRE_KEYWORDS: &[(&str, &str)] = &[
    ("indie", "Indie"),
    ("rock", "Rock"),
    ("metal", "Metal"),
    ("electronic", "Electronic"),
    ("jazz", "Jazz"),
    ("hip-hop", "Hip-Hop"),
    ("hip hop", "Hip-Hop"),
    ("punk", "Punk"),
    ("folk", "Folk"),
    ("pop", "Pop"),
    ("classical", "Classical"),
    ("country", "Country"),
    ("r&b", "R&B"),
    ("soul", "Soul"),
    ("funk", "Funk"),
    ("ambient", "Ambient"),
    ("experimental", "Experimental"),
];

/// True when the lowercased `text` contains any entry of `table`.
pub fn contains_any(text: &str, table: &[&str]) -> bool {
    let lower = text.to_lowercase();
    table.iter().any(|keyword| lower.contains(keyword))
}
