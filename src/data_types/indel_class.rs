
/// Repair-pathway label assigned to an indel size.
/// Declaration order is the output and plotting order.
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd,
    serde::Serialize,
    strum_macros::AsRefStr, strum_macros::Display, strum_macros::EnumString, strum_macros::EnumIter
)]
pub enum IndelClass {
    /// Microhomology-mediated end joining, larger deletions
    #[strum(serialize = "MMEJ", ascii_case_insensitive)]
    #[serde(rename = "MMEJ")]
    Mmej,
    /// Non-homologous end joining, small indels
    #[strum(serialize = "NHEJ", ascii_case_insensitive)]
    #[serde(rename = "NHEJ")]
    Nhej,
    /// No edit, indel size 0
    #[strum(serialize = "uncut", ascii_case_insensitive)]
    #[serde(rename = "uncut")]
    Uncut,
    /// Outside every configured range; these rows are dropped
    #[strum(serialize = "excluded", ascii_case_insensitive)]
    #[serde(rename = "excluded")]
    Excluded
}

impl IndelClass {
    /// Returns true if rows with this class survive classification.
    pub fn is_retained(&self) -> bool {
        match self {
            IndelClass::Mmej |
            IndelClass::Nhej |
            IndelClass::Uncut => true,
            IndelClass::Excluded => false
        }
    }

    /// Fill colour used when plotting this class
    pub fn color(&self) -> &'static str {
        match self {
            IndelClass::Mmej => "#D33873",
            IndelClass::Nhej => "#575757",
            IndelClass::Uncut => "#EFB54F",
            IndelClass::Excluded => "#BDBDBD"
        }
    }
}
