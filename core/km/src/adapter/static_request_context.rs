//! 値を固定で持つ RequestContext 実装（CLI・テスト用）

use crate::ports::outbound::RequestContext;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct StaticRequestContext {
    user_agent: Option<String>,
    person_id: Mutex<Option<String>>,
}

impl StaticRequestContext {
    pub fn new(user_agent: Option<String>, person_id: Option<String>) -> Self {
        Self {
            user_agent,
            person_id: Mutex::new(person_id),
        }
    }
}

impl RequestContext for StaticRequestContext {
    fn user_agent(&self) -> Option<String> {
        self.user_agent.clone()
    }

    fn person_id(&self) -> Option<String> {
        self.person_id.lock().ok().and_then(|g| g.clone())
    }

    fn set_person_id(&self, id: &str) {
        if let Ok(mut g) = self.person_id.lock() {
            *g = Some(id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_person_id_is_visible() {
        let ctx = StaticRequestContext::new(Some("w3m/0.5".into()), None);
        assert_eq!(ctx.person_id(), None);
        ctx.set_person_id("abc");
        assert_eq!(ctx.person_id().as_deref(), Some("abc"));
        assert_eq!(ctx.user_agent().as_deref(), Some("w3m/0.5"));
    }
}
