//! イベント記録ユースケース
//!
//! 1 リクエスト（CLI なら 1 回の実行）につき 1 つ生成して渡す。
//! `record` でアクションを積み、`flush` でまとめてログへ書く。
//! 内部エラーはエラーログに書いて握りつぶし、呼び出し側へは返さない。

use super::log_writer::LogWriter;
use crate::domain::{should_track, Action, LogLine, PropertyMap, PropertyType, RawValue, TypedValue};
use crate::ports::inbound::Tracker;
use crate::ports::outbound::RequestContext;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use common::error::Error;
use common::ports::outbound::{Clock, Log, LogRecord};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// 設定から渡す記録方針
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecorderOptions {
    pub disabled: bool,
    pub track_robots: bool,
}

pub struct Recorder {
    request: Arc<dyn RequestContext>,
    writer: Arc<LogWriter>,
    clock: Arc<dyn Clock>,
    log: Arc<dyn Log>,
    options: RecorderOptions,
    actions: Vec<Action>,
    assigned: PropertyMap,
    track_override: Option<bool>,
    track_decision: Option<bool>,
    now: Option<u64>,
}

impl Recorder {
    pub fn new(
        request: Arc<dyn RequestContext>,
        writer: Arc<LogWriter>,
        clock: Arc<dyn Clock>,
        log: Arc<dyn Log>,
        options: RecorderOptions,
    ) -> Self {
        Self {
            request,
            writer,
            clock,
            log,
            options,
            actions: Vec::new(),
            assigned: PropertyMap::new(),
            track_override: None,
            track_decision: None,
            now: None,
        }
    }

    /// 記録するかを明示する。ロボット判定より優先される
    pub fn set_do_track(&mut self, track: bool) {
        self.track_override = Some(track);
        self.track_decision = None;
    }

    /// このリクエストを記録するか（初回の判定結果を使い回す）
    pub fn do_track(&mut self) -> bool {
        if self.options.disabled {
            return false;
        }
        if let Some(d) = self.track_decision {
            return d;
        }
        let ua = self.request.user_agent();
        let d = should_track(self.track_override, self.options.track_robots, ua.as_deref());
        self.track_decision = Some(d);
        d
    }

    /// 最初に参照した時刻（Unix 秒）。同じリクエストのアクションはすべてこの時刻になる
    pub fn now(&mut self) -> u64 {
        *self.now.get_or_insert_with(|| self.clock.now_secs())
    }

    pub fn pending(&self) -> &[Action] {
        &self.actions
    }

    pub fn assigned(&self) -> &PropertyMap {
        &self.assigned
    }

    /// 訪問者 ID。リクエストに無ければ発行してリクエスト側へ保存する
    pub fn person_id(&mut self) -> String {
        if let Some(id) = self.request.person_id().filter(|s| !s.is_empty()) {
            return id;
        }
        let id = generate_person_id(self.clock.now_ms(), std::process::id());
        self.request.set_person_id(&id);
        id
    }

    fn try_assign(&mut self, name: &str, value: RawValue, ty: PropertyType) -> Result<(), Error> {
        if name.is_empty() {
            return Err(Error::invalid_argument("Property name must not be empty"));
        }
        self.assigned
            .insert(name.to_string(), TypedValue { value, ty });
        Ok(())
    }

    fn try_record(&mut self, name: &str, properties: PropertyMap) -> Result<(), Error> {
        if !self.do_track() {
            return Ok(());
        }
        if name.is_empty() {
            return Err(Error::invalid_argument("Action name must not be empty"));
        }
        self.actions.push(Action::new(name, properties));
        Ok(())
    }

    /// 未書き込みのアクションをログへ書き、一覧を空にする。書けた件数を返す
    pub fn flush(&mut self) -> usize {
        if self.options.disabled || self.actions.is_empty() {
            self.actions.clear();
            return 0;
        }
        let now = self.now();
        let person_id = self.person_id();
        let mut actions = std::mem::take(&mut self.actions);
        let mut written = 0;
        for action in actions.iter_mut() {
            if action.logged {
                continue;
            }
            action.logged = true;
            let props = action.merged_properties(&self.assigned);
            let line = LogLine::from_properties(now, &action.name, &person_id, &props).encode();
            match self.writer.append(&line, false) {
                Ok(()) => written += 1,
                Err(e) => self.log_error("flush", &e),
            }
        }
        written
    }

    /// リクエスト終了時の後始末。積んだアクションを書き、リクエスト単位の状態を捨てる
    pub fn teardown(&mut self) -> usize {
        let written = self.flush();
        self.assigned.clear();
        self.track_override = None;
        self.track_decision = None;
        self.now = None;
        written
    }

    fn log_error(&self, kind: &str, e: &Error) {
        let _ = self
            .log
            .log(&LogRecord::error(e.to_string()).layer("recorder").kind(kind));
    }
}

impl Tracker for Recorder {
    fn assign(&mut self, name: &str, value: RawValue, ty: PropertyType) {
        if let Err(e) = self.try_assign(name, value, ty) {
            self.log_error("assign", &e);
        }
    }

    fn record(&mut self, name: &str, properties: PropertyMap) {
        if let Err(e) = self.try_record(name, properties) {
            self.log_error("record", &e);
        }
    }
}

static PERSON_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// 新しい訪問者 ID（SHA-256 の URL-safe base64、43 文字）
pub fn generate_person_id(now_ms: u64, pid: u32) -> String {
    let n = PERSON_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let hash = Sha256::digest(format!("{}:{}:{}", now_ms, pid, n).as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}
