//! Static correction dictionaries and closed vocabularies
//!
//! Each dictionary maps an exact (already trimmed and uppercased, unless noted)
//! free-text answer to its canonical value. An empty replacement blanks the
//! answer. New garbage appears every wave, so these lists only ever grow.

/// `(variant, canonical)` pairs; `""` as canonical means missing
pub type Dict = &'static [(&'static str, &'static str)];

pub const UNITED_STATES: &str = "UNITED STATES";
pub const CANADA: &str = "CANADA";

/// Countries whose respondents answer the state/province question
pub const STATE_COUNTRIES: [&str; 2] = [UNITED_STATES, CANADA];

/// Canonical vaccine brands (rounds 5, 6)
pub const VACCINE_BRANDS: &[&str] = &["PFIZER", "MODERNA", "ASTRAZENECA", "SINOVAC", "JJ"];
/// Round 8 adds mixed schedules
pub const VACCINE_BRANDS_R8: &[&str] = &["PFIZER", "MODERNA", "ASTRAZENECA", "SINOVAC", "JJ", "MIXED"];
/// Round 9 adds Sputnik
pub const VACCINE_BRANDS_R9: &[&str] = &[
    "PFIZER",
    "MODERNA",
    "ASTRAZENECA",
    "SINOVAC",
    "JJ",
    "SPUTNIK",
    "MIXED",
];

pub const DEMO_COUNTRY: Dict = &[
    ("USA", UNITED_STATES),
    ("US", UNITED_STATES),
    ("UNITED STATES OF AMERICA", UNITED_STATES),
    ("U.S.", UNITED_STATES),
    ("U.S", UNITED_STATES),
    ("U.S.A.", UNITED_STATES),
    ("AMERICAN", UNITED_STATES),
    ("UNITED STATED OF AMERICA", UNITED_STATES),
    ("UNITED STATES IF AMERICA", UNITED_STATES),
    ("UNITED STATES OF AMERICAN", UNITED_STATES),
    ("THE UNITED STATES", UNITED_STATES),
    ("UNITED STTES", UNITED_STATES),
    ("UNITED STATE OF AMERICA", UNITED_STATES),
    ("UNITED STATE", UNITED_STATES),
    ("AMERICA", UNITED_STATES),
    ("EE.UU", UNITED_STATES),
    ("ENGLAND", "UNITED KINGDOM"),
    ("SCOTLAND", "UNITED KINGDOM"),
    ("UK", "UNITED KINGDOM"),
    ("THE NETHERLANDS", "NETHERLANDS"),
    ("BRASIL", "BRAZIL"),
    ("MÉXICO", "MEXICO"),
    ("KOREA", "SOUTH KOREA"),
    ("KSA", "SAUDI ARABIA"),
    ("P. R. CHINA", "CHINA"),
];

/// Demographic rows whose country answer is unusable but known from context,
/// keyed by record id
pub const DEMO_COUNTRY_OVERRIDES: &[(&str, &str)] = &[
    ("1563", UNITED_STATES),
    ("1748", UNITED_STATES),
    ("1650", UNITED_STATES),
];

pub const DEMO_STATE: Dict = &[
    ("WASHINGTON, DC", "DC"),
    ("BOSTON", "MA"),
    ("WASHINGTON STATE", "WA"),
    ("CINNECTICUT", "CT"),
    ("MANHATTAN, NY", "NY"),
    ("NEW YORK STATE", "NY"),
    ("HAWAI'I", "HI"),
    ("CHICAGO", "IL"),
    ("NEW YORK CITY", "NY"),
    ("NEW HAMPHIRE", "NH"),
    ("PROVIDENCE, RHODE ISLAND", "RI"),
    ("NYS", "NY"),
    ("CAMBRIDGE, BOSTON", "MA"),
    ("MASSACHUSSETS", "MA"),
    ("INDIANNA", "IN"),
    ("ONT", "ON"),
    ("TORONTO, ON", "ON"),
    ("PEI", "PE"),
    ("SOUTH CAROLINA/ GEORGIA", ""),
    ("NEW  YORK", "NY"),
    ("MAS", ""),
];

/// School answers (trimmed, original case) merged over the replacement file
pub const SCHOOL: Dict = &[
    ("4 year college", "4 year college/university"),
    ("4 year", "4 year college/university"),
    ("4-year University", "4 year college/university"),
    ("4 Year University", "4 year college/university"),
    ("University (4 year)", "4 year college/university"),
    ("4 Year", "4 year college/university"),
    ("4 year University", "4 year college/university"),
    ("4-year private university", "4 year college/university"),
    ("2 year college", "2 year college/university"),
    ("2-year College", "2 year college/university"),
    ("2.5year college", "2 year college/university"),
    ("2 Year College", "2 year college/university"),
    ("community college 2 year", "2 year college/university"),
    ("2 year", "2 year college/university"),
    ("3 year college", "3 year college/university"),
    ("med school", "Medical School"),
    ("Graduate school - medical school", "Medical School"),
    ("medical school", "Medical School"),
    ("graduate school, PhD", "Graduate School (PhD)"),
    ("grad school", "Graduate School (unspecified)"),
    ("4-year college/university", "4 year college/university"),
    ("Integrated Master's (4 year university)", "4 year college/university"),
    ("4 yr university", "4 year college/university"),
    ("Business University", "College/University (unspecified)"),
    ("University of applied science", "College/University (unspecified)"),
    ("Mandeville high school", "High School"),
    ("Post grad, PhD", "Graduate School (PhD)"),
];

pub const R3_COUNTRY: Dict = &[
    ("USA", UNITED_STATES),
    ("US", UNITED_STATES),
    ("UNITED STATES OF AMERICA", UNITED_STATES),
    ("U.S.", UNITED_STATES),
    ("UNITED STAYED", UNITED_STATES),
    ("AMERICA", UNITED_STATES),
    ("THE US OF A", UNITED_STATES),
    ("UNITES STATES", UNITED_STATES),
    ("U.S.A.", UNITED_STATES),
    ("USAMA", UNITED_STATES),
    ("ENGLAND", "UNITED KINGDOM"),
    ("UK", "UNITED KINGDOM"),
    ("THE NETHERLANDS (EUROPE)", "NETHERLANDS"),
    ("THE NETHERLANDS", "NETHERLANDS"),
    ("COMMONWEALTH OF THE NORTHERN MARIANA ISLANDS", "NORTHERN MARIANA ISLANDS"),
    ("MÉXICO", "MEXICO"),
    ("YES", ""),
    ("0", ""),
    ("NONE", ""),
    ("CANADA AND THE US EQUAL", ""),
];

pub const R3_STATE: Dict = &[
    ("YES", ""),
    ("MASSACHUSSETTS", "MA"),
    ("MASDACHUSETTS", "MA"),
    ("AMHERST, MA", "MA"),
    ("WASHINGTON (STATE)", "WA"),
    ("MASSACHUSETT", "MA"),
    ("WASHINGTON STATE", "WA"),
    ("MASSACHUSETTES", "MA"),
    ("NY- LONG ISLAND", "NY"),
    ("WASHINGTON DC", "DC"),
    ("BRITHISH COLUMBIA", "BC"),
    ("NEW YORK/MASSACHUSETTS (EQUAL TIME)", ""),
];

pub const R5_COUNTRY: Dict = &[
    ("USA", UNITED_STATES),
    ("US", UNITED_STATES),
    ("UNITED STATES OF AMERICA", UNITED_STATES),
    ("U.S.", UNITED_STATES),
    ("THE UNITED STATES", UNITED_STATES),
    ("THE UNITED STATES OF AMERICA", UNITED_STATES),
    ("USTATESNITED", UNITED_STATES),
    ("U.S.A.", UNITED_STATES),
    ("US OF A", UNITED_STATES),
    ("UNITED STATE", UNITED_STATES),
    ("USAP", UNITED_STATES),
    ("RUSSIAN FEDERATION", "RUSSIA"),
    ("ENGLAND", "UNITED KINGDOM"),
    ("UK", "UNITED KINGDOM"),
    ("MÉXICO", "MEXICO"),
    ("COMMONWEALTH OF THE NORTHERN MARIANA ISLANDS", "NORTHERN MARIANA ISLANDS"),
    ("1", ""),
];

pub const R5_STATE: Dict = &[
    ("MASSACHUSETTES", "MA"),
    ("WASHINGTON DC", "DC"),
    ("EST", ""),
    ("MASSACHUSETS", "MA"),
    ("FLORIDA AND MASSACHUSETTS", ""),
    ("ILLNOIS", "IL"),
    ("MASSACHUSSETTS", "MA"),
    ("MASSACHUSETTS AND RHODE ISLAND", ""),
    ("STAYING IN", ""),
    ("50% OHIO & 50% CALIFORNIA", ""),
    ("WORCESTER", "MA"),
    ("MASSACHUCETTES", "MA"),
    ("WASHINGTON STATE", "WA"),
];

pub const R5_VACCINE: Dict = &[
    ("PHIZER", "PFIZER"),
    ("OXFORD", "ASTRAZENECA"),
    ("MODERN", "MODERNA"),
    ("PFOZER", "PFIZER"),
    ("1", ""),
];

pub const R6_VACCINE: Dict = &[
    ("JOHNSON & JOHNSON", "JJ"),
    ("J&J", "JJ"),
    ("JOHNSON&JOHNSON", "JJ"),
    ("PHIZER", "PFIZER"),
    ("PFISZER", "PFIZER"),
    ("PFIXER", "PFIZER"),
    ("OXFORD", "ASTRAZENECA"),
    ("ASTRA ZENECA", "ASTRAZENECA"),
    ("CORONAVAC", "SINOVAC"),
];

pub const R8_COUNTRY: Dict = &[
    ("USA", UNITED_STATES),
    ("US", UNITED_STATES),
    ("UNITED STATES OF AMERICA", UNITED_STATES),
    ("U.S.", UNITED_STATES),
    ("UNITED STATE", UNITED_STATES),
    ("U.S.A.", UNITED_STATES),
    ("THE UNITED STATES", UNITED_STATES),
    ("UNITE STATES OF AMERICA", UNITED_STATES),
    ("AMERICA", UNITED_STATES),
    ("SCOTLAND", "UNITED KINGDOM"),
    ("1", ""),
    ("0", ""),
];

pub const R8_STATE: Dict = &[
    ("NEW HAMSPHIRE", "NH"),
    ("MASSACHUSSETTS", "MA"),
    ("MASSACHUSETTTS", "MA"),
    ("PENNISYLVANIA", "PA"),
    ("WASHINGTON STATE", "WA"),
    ("WORCESTER", "MA"),
    ("DOUGLAS", ""),
    ("50% OHIO & 50% CALIFORNIA", ""),
    ("FLORIDA AND MASSACHUSETTS", ""),
];

pub const R8_VACCINE: Dict = &[
    ("JOHNSON & JOHNSON", "JJ"),
    ("JOHNSON AND JOHNSON", "JJ"),
    ("PRIZER", "PFIZER"),
    ("PFIZER3", "PFIZER"),
    ("BIONTECH", "PFIZER"),
    ("MODERNA 2 SHOTS AND PFIZER ONE SHOT", "MIXED"),
    ("J&J, PFIZER", "MIXED"),
    ("BIONTECH PFIZER", "PFIZER"),
    ("PHIZER", "PFIZER"),
    ("JENSEN", "JJ"),
    ("SINOVAC AND PFIZER ON THE BOOSTER", "MIXED"),
    ("CORONAVAC", "SINOVAC"),
    ("COVISHIELD", "ASTRAZENECA"),
    ("ASTRAZENECA + PFIZER", "MIXED"),
    ("PFIZER/BIONTECH", "PFIZER"),
    ("ASTRAZENICA", "ASTRAZENECA"),
    ("MORDERNA", "MODERNA"),
    ("PFLIZER", "PFIZER"),
    ("PFIZER (2) AND MODERNA (BOOSTER)", "MIXED"),
    ("ASTRAZENENCA (COVISHIELD IN INDIA)", "ASTRAZENECA"),
    ("JOHNSON&JOHNSON", "JJ"),
    ("JOHNSON & JOHONSON", "JJ"),
    (
        "PFIZER - I RECEIVED 3 DOSES, BUT THE NEXT QUESTION DOESN'T PROVIDE THAT OPTION.",
        "PFIZER",
    ),
    ("4/8/21", ""),
];

pub const R9_STATE: Dict = &[
    ("MASSACHUSSETTS", "MA"),
    ("ARKANSAA", "AR"),
    ("WASHINGTON STATE", "WA"),
    ("0", ""),
];

pub const R9_VACCINE: Dict = &[
    ("JOHNSON & JOHNSON", "JJ"),
    ("JOHNSON AND JOHNSON", "JJ"),
    ("BIONTECH", "PFIZER"),
    ("MODERNA 2 SHOTS AND PFIZER ONE SHOT", "MIXED"),
    ("CORONAVAC", "SINOVAC"),
    ("COVISHIELD", "ASTRAZENECA"),
    ("PFIZER/BIONTECH", "PFIZER"),
    ("JOHNSON&JOHNSON", "JJ"),
    ("JOHNSON & JOHONSON", "JJ"),
    ("PHIZER", "PFIZER"),
    ("SPUTNIK V", "SPUTNIK"),
    ("JENSEN", "JJ"),
    ("ASTRAZENICA", "ASTRAZENECA"),
    ("PFRIZER", "PFIZER"),
    ("J AND J", "JJ"),
];

/// Free-text "how many dependent children" answers meaning none (original case)
pub const NO_CHILDREN: &[&str] = &["None", "No", "no", "none", "Not applicable"];

/// Known free-text fever temperatures and their numeric reading
pub const FEVER_TEMPERATURES: &[(&str, f64)] = &[
    ("37,5", 37.5),
    ("38,8", 38.8),
    ("38,6", 38.6),
    ("38,5", 38.5),
    ("100.2 this morning", 100.2),
];

/// Text label sets of the retrospective vaccine survey, with their codes
pub struct LikertLabels {
    pub name: &'static str,
    pub labels: &'static [(&'static str, f64)],
}

pub const AGREEMENT: LikertLabels = LikertLabels {
    name: "agreement",
    labels: &[
        ("Strongly disagree", 1.0),
        ("Disagree", 2.0),
        ("Neither disagree nor agree", 3.0),
        ("Agree", 4.0),
        ("Strongly agree", 5.0),
    ],
};

pub const LIKELIHOOD: LikertLabels = LikertLabels {
    name: "likelihood",
    labels: &[
        ("Not Likely", 1.0),
        ("Somewhat Likely", 2.0),
        ("Moderately Likely", 3.0),
        ("Very Likely", 4.0),
    ],
};

pub const DOZING: LikertLabels = LikertLabels {
    name: "dozing",
    labels: &[
        ("Would NEVER doze", 0.0),
        ("SLIGHT chance of dozing", 1.0),
        ("MODERATE chance of dozing", 2.0),
        ("HIGH chance of dozing", 3.0),
    ],
};

pub const TRUTH: LikertLabels = LikertLabels {
    name: "truth",
    labels: &[
        ("Not true at all", 0.0),
        ("Rarely true", 1.0),
        ("Sometimes true", 2.0),
        ("Often true", 3.0),
        ("True nearly all the time", 4.0),
    ],
};

pub const INTENSITY: LikertLabels = LikertLabels {
    name: "intensity",
    labels: &[
        ("Not at all", 1.0),
        ("Slightly", 2.0),
        ("Moderately", 3.0),
        ("A lot", 4.0),
        ("Extremely", 5.0),
    ],
};

pub const FREQUENCY: LikertLabels = LikertLabels {
    name: "frequency",
    labels: &[
        ("All of the time", 0.0),
        ("Often", 1.0),
        ("Sometimes", 2.0),
        ("Rarely", 3.0),
        ("Never", 4.0),
    ],
};

impl LikertLabels {
    pub fn code(&self, label: &str) -> Option<f64> {
        self.labels
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, code)| *code)
    }

    /// Lowest and highest code
    pub fn range(&self) -> (f64, f64) {
        self.labels.iter().fold((f64::MAX, f64::MIN), |(lo, hi), (_, c)| {
            (lo.min(*c), hi.max(*c))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn unique_keys(dict: Dict) -> bool {
        let keys: HashSet<&str> = dict.iter().map(|(k, _)| *k).collect();
        keys.len() == dict.len()
    }

    #[test]
    fn test_dictionaries_have_unique_keys() {
        for dict in [
            DEMO_COUNTRY,
            DEMO_STATE,
            R3_COUNTRY,
            R3_STATE,
            R5_COUNTRY,
            R5_STATE,
            R5_VACCINE,
            R6_VACCINE,
            R8_COUNTRY,
            R8_STATE,
            R8_VACCINE,
            R9_STATE,
            R9_VACCINE,
        ] {
            assert!(unique_keys(dict));
        }
    }

    #[test]
    fn test_vaccine_dictionaries_map_into_vocabulary() {
        for (dict, vocab) in [
            (R5_VACCINE, VACCINE_BRANDS),
            (R6_VACCINE, VACCINE_BRANDS),
            (R8_VACCINE, VACCINE_BRANDS_R8),
            (R9_VACCINE, VACCINE_BRANDS_R9),
        ] {
            for (_, canonical) in dict {
                assert!(canonical.is_empty() || vocab.contains(canonical));
            }
        }
    }

    #[test]
    fn test_likert_codes() {
        assert_eq!(AGREEMENT.code("Agree"), Some(4.0));
        assert_eq!(DOZING.code("agree"), None);
        assert_eq!(FREQUENCY.range(), (0.0, 4.0));
        assert_eq!(LIKELIHOOD.range(), (1.0, 4.0));
    }
}
