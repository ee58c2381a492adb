use serde::{Deserialize, Serialize};

/// A publication outlet with its own listing page structure.
///
/// Fixed per pipeline instance: every record a driver emits carries the
/// driver's venue, including rows recovered from the fallback source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    #[serde(rename = "AAAI")]
    Aaai,
    #[serde(rename = "CVPR")]
    Cvpr,
    #[serde(rename = "EMNLP")]
    Emnlp,
    #[serde(rename = "ICML")]
    Icml,
    #[serde(rename = "NeurIPS")]
    Neurips,
}

impl Venue {
    pub const ALL: [Venue; 5] = [
        Venue::Aaai,
        Venue::Cvpr,
        Venue::Emnlp,
        Venue::Icml,
        Venue::Neurips,
    ];

    /// Lowercase identifier used for CLI selection and sink file names.
    pub fn id(&self) -> &'static str {
        match self {
            Venue::Aaai => "aaai",
            Venue::Cvpr => "cvpr",
            Venue::Emnlp => "emnlp",
            Venue::Icml => "icml",
            Venue::Neurips => "neurips",
        }
    }

    /// Display label written into the `venue` column.
    pub fn label(&self) -> &'static str {
        match self {
            Venue::Aaai => "AAAI",
            Venue::Cvpr => "CVPR",
            Venue::Emnlp => "EMNLP",
            Venue::Icml => "ICML",
            Venue::Neurips => "NeurIPS",
        }
    }

    pub fn from_id(id: &str) -> Option<Venue> {
        Venue::ALL
            .into_iter()
            .find(|v| v.id().eq_ignore_ascii_case(id))
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One harvested paper. Field order is the wire/column order consumed by the
/// sink: title, abstract, url, doi, year, venue, pub_date_raw.
///
/// Rows start life as extraction drafts (enrichment may still fill `doi`,
/// `abstract` and `pub_date_raw`); once folded into the aggregate they are
/// never mutated; a later duplicate is dropped, not merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
    pub doi: String,
    pub year: Option<i32>,
    pub venue: Venue,
    pub pub_date_raw: String,
}

impl PaperRecord {
    /// A bare listing-page row: title + link only, detail fields empty,
    /// `pub_date_raw` falling back to the year as text.
    pub fn listed(venue: Venue, title: String, url: String, year: Option<i32>) -> Self {
        Self {
            title,
            abstract_text: String::new(),
            url,
            doi: String::new(),
            year,
            venue,
            pub_date_raw: year.map(|y| y.to_string()).unwrap_or_default(),
        }
    }
}

/// Deduplication key: trim and collapse internal whitespace. Case-sensitive,
/// exact post-normalization equality only, no stemming or fuzzy matching.
pub fn normalize_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title_collapses_whitespace() {
        assert_eq!(
            normalize_title("  Attention   Is\n All You\tNeed "),
            "Attention Is All You Need"
        );
    }

    #[test]
    fn test_normalize_title_is_case_sensitive() {
        assert_ne!(normalize_title("Deep Learning"), normalize_title("deep learning"));
    }

    #[test]
    fn test_venue_round_trip() {
        for v in Venue::ALL {
            assert_eq!(Venue::from_id(v.id()), Some(v));
        }
        assert_eq!(Venue::from_id("NEURIPS"), Some(Venue::Neurips));
        assert_eq!(Venue::from_id("acl"), None);
    }

    #[test]
    fn test_record_serializes_in_wire_order() {
        let record = PaperRecord::listed(
            Venue::Cvpr,
            "A Paper".into(),
            "https://example.com/p".into(),
            Some(2023),
        );
        let json = serde_json::to_string(&record).unwrap();
        let title_pos = json.find("\"title\"").unwrap();
        let abs_pos = json.find("\"abstract\"").unwrap();
        let venue_pos = json.find("\"venue\"").unwrap();
        let date_pos = json.find("\"pub_date_raw\"").unwrap();
        assert!(title_pos < abs_pos && abs_pos < venue_pos && venue_pos < date_pos);
        assert!(json.contains("\"venue\":\"CVPR\""));
        assert!(json.contains("\"pub_date_raw\":\"2023\""));
    }
}
