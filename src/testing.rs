use std::collections::VecDeque;
use std::sync::Mutex;

use crate::transport::Transport;
use crate::{Error, Result};

/// Answers each GET with the next scripted result and records the URL.
#[derive(Default)]
pub(crate) struct Scripted {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<String>>,
}

impl Scripted {
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Transport for Scripted {
    async fn get(&self, url: &str) -> Result<String> {
        self.calls.lock().unwrap().push(url.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(Error::NoResponse("script exhausted".into())))
    }
}
