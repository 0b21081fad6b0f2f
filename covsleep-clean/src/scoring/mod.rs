//! Scale-score calculator
//!
//! Summed scales come from the static catalogue; the PSQI and the MCTQ have
//! their own banded and interval-based calculators.

pub mod banding;
pub mod catalogue;
pub mod key;
pub mod mctq;
pub mod psqi;

pub use catalogue::{scales, score_scales, ScaleSpec};
pub use key::{ScaleItem, ScaleKey};
pub use mctq::MctqLayout;
pub use psqi::PsqiLayout;

use crate::sources::TableKey;
use covsleep_common::{Result, Table};
use tracing::info;

/// PSQI administrations of a table
pub fn psqi_layouts(key: TableKey) -> &'static [PsqiLayout] {
    match key {
        TableKey::Round1 => &[psqi::ROUND1],
        TableKey::Round4 => &[psqi::ROUND4],
        TableKey::Round5 => &[psqi::ROUND5],
        TableKey::Round8 => &[psqi::ROUND8],
        _ => &[],
    }
}

/// MCTQ administrations of a table
pub fn mctq_layouts(key: TableKey) -> &'static [MctqLayout] {
    match key {
        TableKey::Round1 => &[mctq::ROUND1_PRE, mctq::ROUND1_POST],
        TableKey::Round4 => &[mctq::ROUND4],
        TableKey::Round5 => &[mctq::ROUND5],
        TableKey::Round8 => &[mctq::ROUND8],
        _ => &[],
    }
}

/// Add every derived score of one formatted table
pub fn score_table(key: TableKey, table: &mut Table) -> Result<()> {
    for layout in psqi_layouts(key) {
        psqi::score(table, layout)?;
    }
    for layout in mctq_layouts(key) {
        mctq::score(table, layout)?;
    }
    let scales = score_scales(key, table)?;
    info!(
        table = %key,
        psqi = psqi_layouts(key).len(),
        mctq = mctq_layouts(key).len(),
        scales,
        "Computed derived scores"
    );
    Ok(())
}
