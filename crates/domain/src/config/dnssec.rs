use serde::{Deserialize, Serialize};

/// DNSSEC validation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DnssecConfig {
    /// Validate answers when the client sets the DO bit (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Validate every answer, whether or not the client asked for DNSSEC
    #[serde(default)]
    pub validate_all: bool,

    /// Trust anchors as textual DS or DNSKEY records,
    /// e.g. `. 172800 IN DS 20326 8 2 E06D...`
    #[serde(default = "default_trust_anchors")]
    pub trust_anchors: Vec<String>,
}

impl Default for DnssecConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            validate_all: false,
            trust_anchors: default_trust_anchors(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Root zone KSK-2017 and KSK-2024.
fn default_trust_anchors() -> Vec<String> {
    vec![
        ". 172800 IN DS 20326 8 2 E06D44B80B8F1D39A95C0B0D7C65D08458E880409BBC683457104237C7F8EC8D"
            .to_string(),
        ". 172800 IN DS 38696 8 2 683D2D0ACB8C9B712A1948B27F741219298D0A450D612C483AF444A4C0FB2B16"
            .to_string(),
    ]
}
