use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::Transport;
use crate::error::FetchError;

pub(crate) enum Reply {
    Json(Value),
    Status(u16),
}

/// Replays scripted replies in order and records every requested URL.
/// Once the script runs out the last reply is repeated.
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Value>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn json(values: Vec<Value>) -> Self {
        Self::new(values.into_iter().map(Reply::Json).collect())
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Reply::Json(value)) => {
                *self.last.lock().unwrap() = Some(value.clone());
                Ok(value)
            }
            Some(Reply::Status(status)) => Err(FetchError::Status {
                url: url.to_string(),
                status,
                body: String::new(),
            }),
            None => Ok(self.last.lock().unwrap().clone().unwrap_or(Value::Array(vec![]))),
        }
    }
}
