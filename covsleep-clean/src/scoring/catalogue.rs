//! Scoring keys of every summed instrument, per table
//!
//! Some instruments are keyed by fixed item lists, others by every column whose
//! name matches the instrument's item pattern (the item count differs between
//! survey versions). [`ScaleSpec::resolve`] turns either form into a concrete
//! [`ScaleKey`] against one table.

use super::key::{numbered, prefixed, ScaleKey};
use crate::sources::TableKey;
use covsleep_common::{Error, Result, Table};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

/// How the item columns of a scale are chosen
#[derive(Debug, Clone)]
pub enum Items {
    Listed(Vec<String>),
    /// Every column whose full name matches the pattern
    Matching(&'static str),
    /// Columns of the positional range `start..=end` whose names pass `filter`
    Between {
        start: &'static str,
        end: &'static str,
        filter: fn(&str) -> bool,
    },
}

impl Items {
    fn resolve(&self, table: &Table) -> Result<Vec<String>> {
        let columns = match self {
            Items::Listed(columns) => columns.clone(),
            Items::Matching(pattern) => {
                let re = Regex::new(&format!("^(?:{})$", pattern))
                    .map_err(|e| Error::Config(format!("item pattern '{}': {}", pattern, e)))?;
                table
                    .columns()
                    .iter()
                    .filter(|c| re.is_match(c))
                    .cloned()
                    .collect()
            }
            Items::Between { start, end, filter } => table
                .columns_between(start, end)?
                .into_iter()
                .filter(|c| filter(c))
                .collect(),
        };
        if columns.is_empty() {
            return Err(Error::invariant(format!(
                "{}: no item columns for {:?}",
                table.name(),
                self
            )));
        }
        Ok(columns)
    }
}

/// Scoring rule of one composite, before its items are resolved
#[derive(Debug, Clone)]
pub struct ScaleSpec {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub forward: Vec<Items>,
    pub reverse: Vec<Items>,
}

impl ScaleSpec {
    fn listed(name: &'static str, min: f64, max: f64, items: Vec<String>) -> Self {
        Self {
            name,
            min,
            max,
            forward: vec![Items::Listed(items)],
            reverse: Vec::new(),
        }
    }

    fn matching(name: &'static str, min: f64, max: f64, pattern: &'static str) -> Self {
        Self {
            name,
            min,
            max,
            forward: vec![Items::Matching(pattern)],
            reverse: Vec::new(),
        }
    }

    fn reversed(mut self, items: Vec<String>) -> Self {
        self.reverse.push(Items::Listed(items));
        self
    }

    pub fn resolve(&self, table: &Table) -> Result<ScaleKey> {
        let mut forward = Vec::new();
        for items in &self.forward {
            forward.extend(items.resolve(table)?);
        }
        let mut reverse = Vec::new();
        for items in &self.reverse {
            reverse.extend(items.resolve(table)?);
        }
        Ok(ScaleKey::sum(self.name, self.min, self.max, forward).reversed(reverse))
    }
}

fn items(prefix: &str, numbers: &[u32]) -> Vec<String> {
    prefixed(prefix, numbers)
}

fn named(prefix: &str, names: &[&str]) -> Vec<String> {
    names.iter().map(|n| format!("{}{}", prefix, n)).collect()
}

fn daily() -> Vec<ScaleSpec> {
    vec![
        ScaleSpec::listed(
            "PANAS_PA",
            1.0,
            5.0,
            named(
                "panas_",
                &[
                    "interested3",
                    "excited3",
                    "strong3",
                    "enthusiastic3",
                    "proud3",
                    "alert3",
                    "inspired3",
                    "determined3",
                    "attentive3",
                    "active3",
                ],
            ),
        ),
        ScaleSpec::listed(
            "PANAS_NA",
            1.0,
            5.0,
            named(
                "panas_",
                &[
                    "distressed3",
                    "upset3",
                    "guilty3",
                    "scared3",
                    "hostile3",
                    "irritable3",
                    "ashamed3",
                    "nervous3",
                    "jittery3",
                    "afraid3",
                ],
            ),
        ),
        ScaleSpec::listed(
            "worry_scale",
            1.0,
            7.0,
            named(
                "",
                &[
                    "worry_health",
                    "family_health",
                    "community_1health",
                    "national_health",
                    "worry_finances",
                ],
            ),
        ),
        ScaleSpec::listed("PHQ9", 0.0, 3.0, numbered("depression", 1..=8)),
    ]
}

fn lsas_before(c: &str) -> bool {
    !c.contains('2')
}

fn lsas_after(c: &str) -> bool {
    c.contains('2')
}

fn lsas_fear_before(c: &str) -> bool {
    c.contains("fear") && lsas_before(c)
}

fn lsas_avoid_before(c: &str) -> bool {
    c.contains("avoid") && lsas_before(c)
}

fn lsas_fear_after(c: &str) -> bool {
    c.contains("fear") && lsas_after(c)
}

fn lsas_avoid_after(c: &str) -> bool {
    c.contains("avoid") && lsas_after(c)
}

fn lsas_range(filter: fn(&str) -> bool) -> Items {
    Items::Between {
        start: "telephone_fear",
        end: "salesperson2_avoid",
        filter,
    }
}

/// BFI-2-S domain or facet from forward and reverse item numbers
fn big5(name: &'static str, forward: &[u32], reverse: &[u32]) -> ScaleSpec {
    ScaleSpec::listed(name, 1.0, 5.0, items("big5_", forward)).reversed(items("big5_", reverse))
}

fn round1() -> Vec<ScaleSpec> {
    let cerq = |name, a, b| ScaleSpec::listed(name, 1.0, 5.0, items("cerq_", &[a, b]));
    vec![
        ScaleSpec::matching("gad_7_total", 0.0, 3.0, r"gad_\d+"),
        cerq("CERQ_Self_Blame", 14, 4),
        cerq("CERQ_Acceptance", 1, 5),
        cerq("CERQ_Catastrophizing", 9, 17),
        cerq("CERQ_Other_blame", 18, 10),
        cerq("CERQ_Rumination", 2, 6),
        cerq("CERQ_Positive_Refocusing", 11, 7),
        cerq("CERQ_Refocus_on_Planning", 15, 12),
        cerq("CERQ_Positive_Reappraisal", 8, 3),
        cerq("CERQ_Putting_into_Perspective", 13, 16),
        lsas("LSAS_Fear_PreCovid", vec![lsas_range(lsas_fear_before)]),
        lsas("LSAS_Anxiety_PreCovid", vec![lsas_range(lsas_avoid_before)]),
        lsas(
            "LSAS_TOTAL_PreCovid",
            vec![lsas_range(lsas_fear_before), lsas_range(lsas_avoid_before)],
        ),
        lsas("LSAS_Fear_PostCovid", vec![lsas_range(lsas_fear_after)]),
        lsas("LSAS_Anxiety_PostCovid", vec![lsas_range(lsas_avoid_after)]),
        lsas(
            "LSAS_TOTAL_PostCovid",
            vec![lsas_range(lsas_fear_after), lsas_range(lsas_avoid_after)],
        ),
        big5("Big_5_Extraversion", &[6, 11, 16], &[1, 21, 26]),
        big5("Big_5_Agreeableness", &[2, 12, 22], &[7, 17, 27]),
        big5("Big_5_Conscientiousness", &[13, 18, 23], &[3, 8, 28]),
        big5("Big_5_Negative_Emotionality", &[4, 9, 29], &[14, 19, 24]),
        big5("Big_5_Open_Mindedness", &[5, 15, 25], &[10, 20, 30]),
        big5("Big_5_Sociability", &[16], &[1]),
        big5("Big_5_Assertiveness", &[6], &[21]),
        big5("Big_5_Energy_Level", &[11], &[26]),
        big5("Big_5_Compassion", &[2], &[17]),
        big5("Big_5_Respectfulness", &[22], &[7]),
        big5("Big_5_Trust", &[12], &[27]),
        big5("Big_5_Organization", &[18], &[3]),
        big5("Big_5_Productiveness", &[23], &[8]),
        big5("Big_5_Responsibility", &[13], &[28]),
        big5("Big_5_Anxiety", &[4], &[19]),
        big5("Big_5_Depression", &[9], &[24]),
        big5("Big_5_Emotional_Volatility", &[29], &[14]),
        big5("Big_5_Aesthetic_Sensitivity", &[5], &[20]),
        big5("Big_5_Intellectual_Curiosity", &[25], &[10]),
        big5("Big_5_Creative_Imagination", &[15], &[30]),
    ]
}

fn lsas(name: &'static str, forward: Vec<Items>) -> ScaleSpec {
    ScaleSpec {
        name,
        min: 0.0,
        max: 3.0,
        forward,
        reverse: Vec::new(),
    }
}

fn pss(name: &'static str) -> ScaleSpec {
    ScaleSpec::listed(name, 0.0, 4.0, items("pss_", &[1, 2, 3, 6, 9, 10]))
        .reversed(items("pss_", &[4, 5, 7, 8]))
}

fn round2() -> Vec<ScaleSpec> {
    vec![
        ScaleSpec::matching("ISI_Total", 0.0, 4.0, r"isi_\d"),
        ScaleSpec::matching("MEQ_Total", 0.0, 6.0, r"meq_\d"),
        ScaleSpec::listed("TEQ_TOTAL", 0.0, 4.0, items("teq_", &[1, 3, 5, 6, 8, 9, 13, 16]))
            .reversed(items("teq_", &[2, 4, 7, 10, 11, 12, 14, 15])),
        pss("PSS_TOTAL"),
    ]
}

fn round3() -> Vec<ScaleSpec> {
    let sibs = |name, n: &[u32]| ScaleSpec::listed(name, 1.0, 4.0, items("sibs_", n));
    let luc = |name, n: &[u32]| ScaleSpec::listed(name, 0.0, 5.0, items("luc_", n));
    vec![
        ScaleSpec::listed("BSCS_Total", 1.0, 5.0, items("bscs_", &[1, 6, 8, 11]))
            .reversed(items("bscs_", &[2, 3, 4, 5, 7, 9, 10, 12, 13])),
        sibs("SUPPS_Neg_Urg", &[4, 7, 12, 17]),
        sibs("SUPPS_Lack_Pers", &[5, 8, 11, 16]),
        sibs("SUPPS_Lack_Premed", &[1, 6, 13, 19]),
        sibs("SUPPS_Sen_Seek", &[3, 9, 14, 18]),
        sibs("SUPPS_Pos_Urg", &[2, 10, 15, 20]),
        ScaleSpec::listed("IU_PA", 1.0, 5.0, numbered("iu_", 1..=7)),
        ScaleSpec::listed("IU_IA", 1.0, 5.0, numbered("iu_", 8..=12)),
        ScaleSpec::listed("IU_Total", 1.0, 5.0, numbered("iu_", 1..=12)),
        ScaleSpec::listed("ERQ_Cog_Reapp", 1.0, 7.0, items("erq_", &[1, 3, 5, 7, 8, 10])),
        ScaleSpec::listed("ERQ_Exp_Supp", 1.0, 7.0, items("erq_", &[2, 4, 6, 9])),
        ScaleSpec::matching("COVID_Pos_Total", 1.0, 5.0, r"covpos_\d"),
        ScaleSpec::matching("Pos_Social_Behavior_Total", 1.0, 4.0, r"sd_\d*"),
        luc("Lucidity_Insight", &[1, 3, 8, 9, 16, 19]),
        luc("Lucidity_Control", &[4, 6, 10, 14, 23]),
        luc("Lucidity_Thought", &[5, 12, 22]),
        luc("Lucidity_realism", &[7, 17, 20]),
        luc("Lucidity_Memory", &[2, 13, 18, 24]),
        luc("Lucidity_Dissociation", &[11, 15, 21]),
        luc("Lucidity_Neg_emotion", &[26, 28]),
        luc("Lucidity_Pos_emotion", &[25, 27]),
        ScaleSpec::listed("Dream_PANAS_PA", 0.0, 4.0, numbered("pandr_", 1..=9)),
        ScaleSpec::listed("Dream_PANAS_NA", 0.0, 4.0, numbered("pandr_", 10..=18)),
        ScaleSpec::listed("MW_Deliberate", 1.0, 7.0, items("mw_", &[1, 2, 3, 7])),
        ScaleSpec::listed("MW_Spontaneous", 1.0, 7.0, items("mw_", &[4, 5, 6, 8])),
    ]
}

fn round4() -> Vec<ScaleSpec> {
    vec![
        ScaleSpec::matching("fall_ISI_Total", 0.0, 4.0, r"fall_isi_\d+"),
        ScaleSpec::matching("fall_gad_7_total", 0.0, 3.0, r"fall_gad_\d+"),
    ]
}

/// PID-5-BF raw total and domains
fn pid(total: &'static str, domains: [&'static str; 5]) -> Vec<ScaleSpec> {
    let domain = |name, n: &[u32]| ScaleSpec::listed(name, 0.0, 3.0, items("pid_", n));
    vec![
        ScaleSpec::matching(total, 0.0, 3.0, r"pid_\d+"),
        domain(domains[0], &[8, 9, 10, 11, 15]),
        domain(domains[1], &[4, 13, 14, 16, 18]),
        domain(domains[2], &[17, 19, 20, 22, 25]),
        domain(domains[3], &[1, 2, 3, 5, 6]),
        domain(domains[4], &[7, 12, 21, 23, 24]),
    ]
}

fn promis(name: &'static str) -> ScaleSpec {
    ScaleSpec::listed(name, 1.0, 5.0, numbered("promis_", 1..=6)).reversed(items("promis_", &[7]))
}

fn round5() -> Vec<ScaleSpec> {
    let iri = |name, forward: &[u32], reverse: &[u32]| {
        ScaleSpec::listed(name, 0.0, 4.0, items("iri_", forward)).reversed(items("iri_", reverse))
    };
    let mut specs = vec![
        ScaleSpec::matching("Feb21_ISI_Total", 0.0, 4.0, r"isi_\d"),
        promis("Feb21_PROMIS_Total"),
        pss("Feb21_PSS_TOTAL"),
        ScaleSpec::matching("Feb21_gad_7_total", 0.0, 3.0, r"gad_\d+"),
        ScaleSpec::listed(
            "MMQ_Satisfaction_Feb21",
            0.0,
            4.0,
            items("mmq_", &[2, 4, 5, 7, 8, 10, 11, 14, 15, 16, 18]),
        )
        .reversed(items("mmq_", &[1, 3, 6, 9, 12, 13, 17])),
        ScaleSpec::matching("Feb21_COVID_Pos_Total", 1.0, 5.0, r"covpos_\d+"),
        iri("IRI_Perspective_Taking", &[8, 11, 21, 25, 28], &[3, 15]),
        iri("IRI_Fantasy", &[1, 5, 16, 23, 26], &[7, 12]),
        iri("IRI_Empathic_Concern", &[2, 9, 20, 22], &[4, 14, 18]),
        iri("IRI_Personal_Distress", &[6, 10, 17, 24, 27], &[13, 19]),
    ];
    specs.extend(pid(
        "PID_Total_Raw_Score",
        [
            "PID_Total_Negative_Affect",
            "PID_Total_Detachment",
            "PID_Total_Antagonism",
            "PID_Total_Disinhibition",
            "PID_Total_Psychoticisim",
        ],
    ));
    specs.extend([
        ScaleSpec::matching("JHACS_TOTAL", 0.0, 5.0, r"jhacs_\d+"),
        ScaleSpec::listed("ACE_Original_10", 0.0, 1.0, numbered("ace_", 1..=10)),
        ScaleSpec::listed("ACE_Added_8", 0.0, 1.0, numbered("ace_", 11..=18)),
        ScaleSpec::matching("ACE_TOTAL", 0.0, 1.0, r"ace_\d+"),
    ]);
    specs
}

/// LSAS fear, avoidance and total over every `*_fear` / `*_avoid` column
fn lsas_by_suffix() -> Vec<ScaleSpec> {
    vec![
        lsas("LSAS_Fear", vec![Items::Matching(r".*_fear")]),
        lsas("LSAS_Anxiety", vec![Items::Matching(r".*_avoid")]),
        lsas(
            "LSAS_TOTAL",
            vec![Items::Matching(r".*_fear"), Items::Matching(r".*_avoid")],
        ),
    ]
}

fn round7() -> Vec<ScaleSpec> {
    let cdrisc = |name, n: &[u32]| ScaleSpec::listed(name, 0.0, 4.0, items("Q91_", n));
    vec![
        ScaleSpec::matching("FIRST_Total", 1.0, 4.0, r"Q89_\d+"),
        ScaleSpec::matching("Epworth_Total", 0.0, 3.0, r"Q90_\d+"),
        ScaleSpec::matching("CDRISC_10_Total", 0.0, 4.0, r"Q91_\d+"),
        cdrisc("CDRISC_flexibility", &[1, 5]),
        cdrisc("CDRISC_self_efficacy", &[2, 4, 9]),
        cdrisc("CDRISC_regulate_emotions", &[10]),
        cdrisc("CDRISC_optimism", &[3, 6, 8]),
        cdrisc("CDRISC_cognitive_focus", &[7]),
        ScaleSpec::matching("PSAS_Total", 1.0, 5.0, r"Q92_\d+"),
        ScaleSpec::listed("PSAS_Somatic", 1.0, 5.0, numbered("Q92_", 1..=8)),
        ScaleSpec::listed("PSAS_Cognitive", 1.0, 5.0, numbered("Q92_", 9..=16)),
        ScaleSpec::matching("MMQ_Ability_total", 0.0, 4.0, r"Q93_\d+"),
    ]
}

const ISDI_FORWARD: &[&str] = &[
    "fallasleep", "nightmares", "wakefallasleep", "lightsleep", "legs", "movesleep",
    "tiredday", "hardwakeweek", "wakeearly", "longnaps", "irregularbedtime",
    "legpaincramps", "awakeworrying", "troublefallasleep", "sitdrowsy",
    "recurringbaddreams", "wakefrequently", "napanywhere", "awakenoises",
    "legsensations", "nervousness", "kicklegs", "lessenergy", "dreamsdisturb",
    "feelworsemorning", "timebacktosleep", "dozetv", "sleeproutine", "legsstill",
    "anxietyasleep", "legsjerk", "layawake", "enoughenergy", "nightmareswake",
    "tiredmorning", "troublestayasleep", "sleepday", "wakeirregular",
    "movelegsuncomfortable", "mindraces", "frighteningdreams", "movearound",
    "troublewaking", "wakenoreason", "dozeoffrelax", "sleepdisturbed", "wokenlegs",
    "thinkingevents", "kickpunch", "hardrelaxbedtime", "focustired", "dreamsvividfeel",
    "attentiontired", "dreamsunpleasant", "awakethinking", "tiredwakeup", "sleeppoorly",
    "trytoohard", "strugglealert", "baddreams", "upearlier", "upearlierthanplanned",
    "baddreamhappened", "wakebeforeneed", "nightmareshard", "hardcomfortable",
    "sleepyday", "nightmaresphysical", "daytimesleepy", "cantmovewakeup",
    "intenseimages", "musclesfrozen", "lyingpresence", "unablemove", "seehearnotreal",
    "dreamlikemorning",
];

const ISDI_REVERSE: &[&str] = &[
    "wideawake", "rested", "naps", "waketime", "worries", "sleepquickly", "nonightmares",
    "deepsleeper", "dontmove", "energized", "eveningsleeptime", "fallasleepminutes",
    "loudnoises", "sleepthroughanything", "raretroubleasleep", "drifteasily", "sleepybed",
];

fn isdi(name: &'static str, forward: &[&str], reverse: &[&str]) -> ScaleSpec {
    let spec = ScaleSpec::listed(name, 0.0, 1.0, named("isdi_", forward));
    if reverse.is_empty() {
        spec
    } else {
        spec.reversed(named("isdi_", reverse))
    }
}

fn round8() -> Vec<ScaleSpec> {
    let mut specs = vec![
        ScaleSpec::listed("NEG_MEMORY_Total", 1.0, 5.0, items("mem_oct", &[1, 4, 5]))
            .reversed(items("mem_oct", &[2, 3, 6])),
        ScaleSpec::matching("Nostalgia_Total", 1.0, 5.0, r"pine_?\d+"),
        ScaleSpec::matching("Oct21_ISI_Total", 0.0, 4.0, r"isi_\d+"),
        promis("Oct21_PROMIS_Total"),
        ScaleSpec::listed(
            "PROMIS_Sleep_Disturbance_Total",
            1.0,
            5.0,
            items("promis_sd_", &[1, 4, 5, 6]),
        )
        .reversed(items("promis_sd_", &[2, 3, 7, 8])),
        ScaleSpec::listed(
            "PROMISE_SRI_Total",
            1.0,
            5.0,
            items("promis_sri_", &[1, 3, 4, 5, 6, 7, 8]),
        )
        .reversed(items("promis_sri_", &[2])),
        ScaleSpec::matching("Oct21_gad_7_total", 0.0, 3.0, r"gad_\d+"),
        pss("Oct21_PSS_TOTAL"),
    ];
    specs.extend(lsas_by_suffix());
    specs.extend(pid(
        "PID_Oct21_Total_Raw_Score",
        [
            "PID_Oct21_Total_Negative_Affect",
            "PID_Oct21_Total_Detachment",
            "PID_Oct21_Total_Antagonism",
            "PID_Oct21_Total_Disinhibition",
            "PID_Oct21_Total_Psychoticisim",
        ],
    ));
    specs.extend([
        isdi("ISDI_TOTAL", ISDI_FORWARD, ISDI_REVERSE),
        isdi(
            "ISDI_Nightmares",
            &[
                "nightmares",
                "recurringbaddreams",
                "dreamsdisturb",
                "nightmareswake",
                "frighteningdreams",
                "dreamsvividfeel",
                "dreamsunpleasant",
                "baddreams",
                "baddreamhappened",
                "nightmareshard",
                "nightmaresphysical",
            ],
            &["nonightmares"],
        ),
        isdi(
            "ISDI_Initial_Insomnia",
            &[
                "fallasleep",
                "troublefallasleep",
                "layawake",
                "hardrelaxbedtime",
                "trytoohard",
                "hardcomfortable",
            ],
            &["sleepquickly", "fallasleepminutes", "raretroubleasleep", "drifteasily", "sleepybed"],
        ),
        isdi(
            "ISDI_Fatigue",
            &[
                "tiredday",
                "sitdrowsy",
                "lessenergy",
                "enoughenergy",
                "focustired",
                "attentiontired",
                "strugglealert",
                "sleepyday",
                "daytimesleepy",
            ],
            &["wideawake"],
        ),
        isdi(
            "ISDI_Nonrestorative_Sleep",
            &[
                "hardwakeweek",
                "feelworsemorning",
                "tiredmorning",
                "troublewaking",
                "tiredwakeup",
                "upearlier",
            ],
            &["rested", "energized"],
        ),
        ScaleSpec::listed(
            "ISDI_Daytime_Disturbances",
            0.0,
            10.0,
            vec!["ISDI_Fatigue".to_string(), "ISDI_Nonrestorative_Sleep".to_string()],
        ),
        isdi(
            "ISDI_Fragmented_sleep",
            &[
                "wakefallasleep",
                "wakeearly",
                "wakefrequently",
                "timebacktosleep",
                "troublestayasleep",
                "wakenoreason",
                "sleeppoorly",
                "upearlierthanplanned",
                "wakebeforeneed",
            ],
            &[],
        ),
        isdi(
            "ISDI_Anxiety_Night",
            &[
                "awakeworrying",
                "nervousness",
                "anxietyasleep",
                "mindraces",
                "thinkingevents",
                "awakethinking",
            ],
            &["worries"],
        ),
        isdi(
            "ISDI_Light_Sleep",
            &["lightsleep", "awakenoises", "sleepdisturbed"],
            &["deepsleeper", "loudnoises", "sleepthroughanything"],
        ),
        isdi(
            "ISDI_Movement_Night",
            &["movesleep", "kicklegs", "legsjerk", "movearound", "kickpunch"],
            &["dontmove"],
        ),
        isdi(
            "ISDI_Sensations_Night",
            &[
                "legs",
                "legpaincramps",
                "legsensations",
                "legsstill",
                "movelegsuncomfortable",
                "wokenlegs",
            ],
            &[],
        ),
        isdi(
            "ISDI_Excessive_Sleep",
            &["longnaps", "napanywhere", "dozetv", "sleepday", "dozeoffrelax"],
            &["naps"],
        ),
        isdi(
            "ISDI_Irregular_Schedule",
            &["irregularbedtime", "sleeproutine", "wakeirregular"],
            &["waketime", "eveningsleeptime"],
        ),
        isdi(
            "ISDI_Sleep_Paralysis",
            &["cantmovewakeup", "musclesfrozen", "unablemove"],
            &[],
        ),
        isdi(
            "ISDI_Sleep_Hallucinations",
            &["intenseimages", "lyingpresence", "seehearnotreal", "dreamlikemorning"],
            &[],
        ),
    ]);
    specs
}

static CATALOGUE: Lazy<HashMap<TableKey, Vec<ScaleSpec>>> = Lazy::new(|| {
    HashMap::from([
        (TableKey::Daily, daily()),
        (TableKey::Demographics, Vec::new()),
        (TableKey::Round1, round1()),
        (TableKey::Round2, round2()),
        (TableKey::Round3, round3()),
        (TableKey::Round4, round4()),
        (TableKey::Round5, round5()),
        (TableKey::Round6, lsas_by_suffix()),
        (TableKey::Round7, round7()),
        (TableKey::Round8, round8()),
        (TableKey::Round9, Vec::new()),
    ])
});

/// Summed scales of one table, in the order they are computed
pub fn scales(key: TableKey) -> &'static [ScaleSpec] {
    CATALOGUE.get(&key).map(Vec::as_slice).unwrap_or(&[])
}

/// Resolve and apply every summed scale of one table
pub fn score_scales(key: TableKey, table: &mut Table) -> Result<usize> {
    let specs = scales(key);
    for spec in specs {
        let scale = spec.resolve(table)?;
        debug!(table = table.name(), scale = spec.name, items = scale.items.len(), "Scoring scale");
        scale.apply(table)?;
    }
    Ok(specs.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use covsleep_common::Value;

    fn table(columns: &[&str], row: &[&str]) -> Table {
        Table::from_rows(
            "r8",
            columns.iter().map(|c| c.to_string()).collect(),
            vec![row.iter().map(|v| Value::from_raw(v)).collect()],
        )
        .unwrap()
    }

    #[test]
    fn test_every_table_has_an_entry() {
        for key in TableKey::ALL {
            assert!(CATALOGUE.contains_key(&key), "{}", key);
        }
        assert!(scales(TableKey::Demographics).is_empty());
        assert_eq!(scales(TableKey::Round6).len(), 3);
    }

    #[test]
    fn test_names_unique_per_table() {
        for key in TableKey::ALL {
            let mut names: Vec<&str> = scales(key).iter().map(|s| s.name).collect();
            let n = names.len();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), n, "{}", key);
        }
    }

    #[test]
    fn test_isdi_item_counts() {
        assert_eq!(ISDI_FORWARD.len() + ISDI_REVERSE.len(), 93);
        let mut all: Vec<&str> = ISDI_FORWARD.iter().chain(ISDI_REVERSE).copied().collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 93);
    }

    #[test]
    fn test_pattern_items_resolve_against_columns() {
        let t = table(
            &["record_id", "telephone_fear", "telephone_avoid", "party_fear", "party_avoid"],
            &["1", "1", "2", "3", "0"],
        );
        let keys: Vec<ScaleKey> = lsas_by_suffix().iter().map(|s| s.resolve(&t).unwrap()).collect();
        assert_eq!(keys[0].items.len(), 2);
        assert_eq!(keys[2].items.len(), 4);
        assert_eq!(keys[2].score_row(&t, 0).unwrap(), Some(6.0));
    }

    #[test]
    fn test_positional_range_with_filter() {
        let t = table(
            &[
                "telephone_fear",
                "telephone_avoid",
                "telephone2_fear",
                "telephone2_avoid",
                "salesperson2_avoid",
                "gad_1",
            ],
            &["1", "1", "3", "2", "2", "0"],
        );
        let before = lsas("x", vec![lsas_range(lsas_fear_before)]).resolve(&t).unwrap();
        assert_eq!(before.columns().collect::<Vec<_>>(), vec!["telephone_fear"]);
        let after = lsas("y", vec![lsas_range(lsas_avoid_after)]).resolve(&t).unwrap();
        assert_eq!(after.items.len(), 2);
    }

    #[test]
    fn test_missing_pattern_is_invariant() {
        let t = table(&["record_id"], &["1"]);
        let spec = ScaleSpec::matching("gad_7_total", 0.0, 3.0, r"gad_\d+");
        assert!(matches!(spec.resolve(&t), Err(Error::Invariant(_))));
    }

    #[test]
    fn test_reverse_scored_promis() {
        let mut columns: Vec<String> = numbered("promis_", 1..=7);
        columns.push("isi_1".into());
        let refs: Vec<&str> = columns.iter().map(String::as_str).collect();
        let t = table(&refs, &["1", "1", "1", "1", "1", "1", "5", "0"]);
        let key = promis("Feb21_PROMIS_Total").resolve(&t).unwrap();
        assert_eq!(key.score_row(&t, 0).unwrap(), Some(7.0));
    }
}
