//! In-memory score record store
//!
//! Stands in for the external user-record store. Keys are canonical
//! [`Address`] values, so differently-cased inputs never split one identity
//! into two records.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::address::Address;
use crate::scoring::PvcScore;

/// Latest score for an address.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreRecord {
    pub score: PvcScore,
    /// Linked Farcaster id, if known.
    pub fid: Option<u64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ScoreStore {
    records: DashMap<Address, ScoreRecord>,
    fids: DashMap<u64, Address>,
}

impl ScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `score.address`. A `None` fid keeps
    /// any previously linked fid.
    pub fn upsert(&self, score: PvcScore, fid: Option<u64>) -> ScoreRecord {
        let address = score.address.clone();
        let current = self.records.get(&address).and_then(|r| r.fid);
        let fid = fid.or(current);

        if let Some(old) = current.filter(|old| Some(*old) != fid) {
            self.fids.remove_if(&old, |_, owner| owner == &address);
        }

        if let Some(fid) = fid {
            if let Some(previous) = self.fids.insert(fid, address.clone()) {
                if previous != address {
                    debug!(fid, from = %previous, to = %address, "Relinked fid");
                    self.records.alter(&previous, |_, mut record| {
                        record.fid = None;
                        record
                    });
                }
            }
        }

        let record = ScoreRecord {
            score,
            fid,
            updated_at: Utc::now(),
        };
        self.records.insert(address, record.clone());
        record
    }

    pub fn get(&self, address: &Address) -> Option<ScoreRecord> {
        self.records.get(address).map(|r| r.clone())
    }

    pub fn find_by_fid(&self, fid: u64) -> Option<ScoreRecord> {
        let address = self.fids.get(&fid).map(|a| a.clone())?;
        self.get(&address)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
