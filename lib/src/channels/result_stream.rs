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

//! Ordered producer-to-host delivery over two wake channels.
//!
//! ```text
//!  producer threads                       host thread
//!  add(item) ──► buffer ──► data wake ──► on_data: next_results()
//!                                                  ... emit ...
//!                                                  results_processed()
//!  end() ── waits for drain + ack ──► end wake ──► on_end
//! ```
//!
//! The data and end wakes are independent handles; the only thing that keeps
//! "end" behind the data is [`ResultStream::end`] blocking its producer
//! thread until the consumer has drained and acknowledged everything.

use std::sync::Arc;

use log::trace;

use super::buffer::ResultBuffer;
use crate::host::{CrossThreadSignal, EventLoop};

pub struct ResultStream<T> {
    buffer: ResultBuffer<T>,
    data_signal: CrossThreadSignal,
    end_signal: CrossThreadSignal,
}

impl<T: Send + 'static> ResultStream<T> {
    pub fn new(data_signal: CrossThreadSignal, end_signal: CrossThreadSignal) -> Self {
        Self {
            buffer: ResultBuffer::new(),
            data_signal,
            end_signal,
        }
    }

    /// Register both wake handles on `event_loop` and build the stream.
    ///
    /// The callbacks run on the host thread and hold only a weak reference
    /// to the stream; once the stream is dropped they do nothing.
    pub fn create<D, E>(event_loop: &EventLoop, mut on_data: D, on_end: E) -> Arc<Self>
    where
        D: FnMut(&ResultStream<T>) + 'static,
        E: FnMut() + 'static,
    {
        Arc::new_cyclic(|weak| {
            let weak = weak.clone();
            let data_signal = event_loop.async_handle(move || {
                if let Some(stream) = weak.upgrade() {
                    on_data(&*stream);
                }
            });
            let end_signal = event_loop.async_handle(on_end);
            Self::new(data_signal, end_signal)
        })
    }

    /// Producer side. Appends `item` and wakes the consumer. Never blocks.
    pub fn add(&self, item: T) -> bool {
        if !self.buffer.push(item) {
            trace!("Dropping result added to a closed stream");
            return false;
        }
        self.data_signal.signal();
        true
    }

    /// Consumer side. Everything buffered so far, oldest first.
    pub fn next_results(&self) -> Vec<T> {
        self.buffer.drain()
    }

    /// Consumer side. The last drained batch has been fully handled.
    pub fn results_processed(&self) {
        self.buffer.acknowledge();
    }

    /// Producer side, after the last [`add`](Self::add). Blocks the calling
    /// thread until the consumer has drained and acknowledged every item,
    /// then raises the end wake.
    ///
    /// Only the first call ends the stream; later calls return `false`
    /// immediately, as does a call interrupted by [`close`](Self::close).
    pub fn end(&self) -> bool {
        if !self.buffer.finish() {
            return false;
        }
        self.end_signal.signal()
    }

    pub fn is_ended(&self) -> bool {
        self.buffer.is_ended()
    }

    /// Tear down both wake handles. Producers still holding the stream see
    /// their adds dropped and any blocked `end` released.
    pub fn close(&self) {
        self.buffer.close();
        self.data_signal.close();
        self.end_signal.close();
    }

    pub fn is_closed(&self) -> bool {
        self.buffer.is_closed()
    }
}

impl<T> Drop for ResultStream<T> {
    fn drop(&mut self) {
        self.data_signal.close();
        self.end_signal.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::thread;
    use std::time::Duration;
    use tokio::time::timeout;

    #[derive(Debug, PartialEq)]
    enum Seen {
        Data(u32),
        End,
    }

    fn test_loop() -> EventLoop {
        EventLoop::new(&BridgeConfig {
            worker_pool_size: 1,
            ..BridgeConfig::default()
        })
        .unwrap()
    }

    fn recording_stream(
        event_loop: &EventLoop,
        seen: &Rc<RefCell<Vec<Seen>>>,
    ) -> Arc<ResultStream<u32>> {
        let on_data_seen = Rc::clone(seen);
        let on_end_seen = Rc::clone(seen);
        ResultStream::create(
            event_loop,
            move |stream: &ResultStream<u32>| {
                for item in stream.next_results() {
                    on_data_seen.borrow_mut().push(Seen::Data(item));
                }
                stream.results_processed();
            },
            move || on_end_seen.borrow_mut().push(Seen::End),
        )
    }

    #[tokio::test]
    async fn test_end_is_observed_after_all_data() {
        let event_loop = test_loop();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let stream = recording_stream(&event_loop, &seen);

        let producer_stream = Arc::clone(&stream);
        let producer = thread::spawn(move || {
            for i in 0..50 {
                producer_stream.add(i);
                if i % 10 == 0 {
                    thread::sleep(Duration::from_millis(1));
                }
            }
            producer_stream.end()
        });

        let done_seen = Rc::clone(&seen);
        let satisfied = timeout(
            Duration::from_secs(5),
            event_loop.run_until(|| done_seen.borrow().last() == Some(&Seen::End)),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(satisfied);
        assert!(producer.join().unwrap());

        let expected: Vec<Seen> = (0..50).map(Seen::Data).chain([Seen::End]).collect();
        assert_eq!(*seen.borrow(), expected);
        stream.close();
    }

    #[tokio::test]
    async fn test_second_end_is_ignored() {
        let event_loop = test_loop();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let stream = recording_stream(&event_loop, &seen);

        assert!(stream.end());
        assert!(!stream.end());
        assert!(stream.is_ended());

        let done_seen = Rc::clone(&seen);
        timeout(
            Duration::from_secs(5),
            event_loop.run_until(|| !done_seen.borrow().is_empty()),
        )
        .await
        .unwrap()
        .unwrap();
        stream.close();
        timeout(Duration::from_secs(5), event_loop.run())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*seen.borrow(), vec![Seen::End]);
    }

    #[tokio::test]
    async fn test_close_drops_late_adds_and_lets_loop_exit() {
        let event_loop = test_loop();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let stream = recording_stream(&event_loop, &seen);

        stream.close();
        assert!(!stream.add(1));
        assert!(!stream.end());

        timeout(Duration::from_secs(5), event_loop.run())
            .await
            .unwrap()
            .unwrap();
        assert!(seen.borrow().is_empty());
        assert_eq!(event_loop.handle_count(), 0);
    }
}
