// Copyright 2025 The Drasi Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::channels::ResultStream;
use crate::native::{NativeValue, ResultCollector};

type ItemCallback = Box<dyn Fn(NativeValue) + Send + Sync>;
type EndCallback = Box<dyn Fn() + Send + Sync>;

/// Result collector that forwards each result as it arrives.
///
/// Holds no results of its own, so [`get_result`](ResultCollector::get_result)
/// is always `None`. Errors from the execute call are the caller's concern.
pub struct StreamingCollector {
    on_item: ItemCallback,
    on_end: EndCallback,
}

impl StreamingCollector {
    pub fn new<I, E>(on_item: I, on_end: E) -> Self
    where
        I: Fn(NativeValue) + Send + Sync + 'static,
        E: Fn() + Send + Sync + 'static,
    {
        Self {
            on_item: Box::new(on_item),
            on_end: Box::new(on_end),
        }
    }

    /// Forward into `stream`: results to `add`, the end to `end`.
    pub fn for_stream(stream: Arc<ResultStream<NativeValue>>) -> Self {
        let end_stream = Arc::clone(&stream);
        Self::new(
            move |result| {
                stream.add(result);
            },
            move || {
                end_stream.end();
            },
        )
    }
}

impl ResultCollector for StreamingCollector {
    fn add_result(&self, result: NativeValue) {
        (self.on_item)(result);
    }

    fn end_results(&self) {
        (self.on_end)();
    }

    fn get_result(&self) -> Option<Vec<NativeValue>> {
        None
    }
}

/// Result collector for synchronous calls: keeps everything until asked.
#[derive(Default)]
pub struct BufferingCollector {
    results: Mutex<Vec<NativeValue>>,
    ended: AtomicBool,
}

impl BufferingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    pub fn take_results(&self) -> Vec<NativeValue> {
        std::mem::take(&mut *self.results.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ResultCollector for BufferingCollector {
    fn add_result(&self, result: NativeValue) {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result);
    }

    fn end_results(&self) {
        self.ended.store(true, Ordering::Release);
    }

    fn get_result(&self) -> Option<Vec<NativeValue>> {
        Some(
            self.results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        )
    }

    fn clear_results(&self) {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
