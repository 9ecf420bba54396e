//! 転送デーモンのトップレベル
//!
//! 同時実行数の上限を確認してから、候補が無くなるまで claim → 転送 → 解放 を繰り返す。
//! 失敗した ID はこの実行中は再び選ばない。

use super::claim::ClaimStore;
use super::transfer::{TransferDaemon, TransferOutcome};
use crate::ports::outbound::ProcessTable;
use common::error::Error;
use common::segment::SegmentId;
use std::collections::BTreeSet;
use std::sync::Arc;

/// 1 回の実行で処理したセグメント
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverReport {
    pub uploaded: Vec<SegmentId>,
    pub failed: Vec<SegmentId>,
    pub missing: Vec<SegmentId>,
}

impl DriverReport {
    /// 何も処理しなかった（候補が無かった）
    pub fn is_empty(&self) -> bool {
        self.uploaded.is_empty() && self.failed.is_empty() && self.missing.is_empty()
    }
}

pub struct MatDriver {
    claims: ClaimStore,
    transfer: TransferDaemon,
    processes: Arc<dyn ProcessTable>,
    max_daemons: usize,
}

impl MatDriver {
    pub fn new(
        claims: ClaimStore,
        transfer: TransferDaemon,
        processes: Arc<dyn ProcessTable>,
        max_daemons: usize,
    ) -> Self {
        Self {
            claims,
            transfer,
            processes,
            max_daemons,
        }
    }

    /// デーモン数が上限を超えていれば何もせず Err
    pub fn check_ceiling(&self) -> Result<(), Error> {
        let running = self.processes.count_daemons()?;
        if running > self.max_daemons {
            return Err(Error::system(format!(
                "{} transfer daemons running (max {}); exiting",
                running, self.max_daemons
            )));
        }
        Ok(())
    }

    pub fn run(&self, start: Option<SegmentId>) -> Result<DriverReport, Error> {
        self.check_ceiling()?;
        let mut report = DriverReport::default();
        let mut ignore = BTreeSet::new();
        let mut start = start;
        while let Some(id) = self.claims.next_candidate(start.take().as_ref(), &ignore)? {
            let Some(guard) = self.claims.try_claim(&id)? else {
                ignore.insert(id);
                continue;
            };
            let outcome = self.transfer.run(&id);
            drop(guard);
            match outcome {
                TransferOutcome::Uploaded => report.uploaded.push(id),
                TransferOutcome::Failed => {
                    ignore.insert(id.clone());
                    report.failed.push(id);
                }
                TransferOutcome::Missing => {
                    ignore.insert(id.clone());
                    report.missing.push(id);
                }
            }
        }
        Ok(report)
    }
}
