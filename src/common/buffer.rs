//! 命令缓冲区
//!
//! 功能
//! - 单一消费者线程持有状态对象，按入队顺序执行闭包命令
//! - 任意线程都可以安全入队
//! - stop 时先执行完已入队的命令，再退出并回收线程

use std::sync::mpsc;
use std::thread;

use crate::{debug, warn};

const LOG_TAG: &str = "command_buffer";

/// 入队的命令闭包，在消费线程上获得状态的可变借用
pub type Command<S> = Box<dyn FnOnce(&mut S) + Send + 'static>;

enum Envelope<S> {
    Run(Command<S>),
    Stop,
}

/// 命令发送端，可以在任意线程上克隆与使用
pub struct CommandSender<S> {
    tx: mpsc::Sender<Envelope<S>>,
}

impl<S> Clone for CommandSender<S> {
    fn clone(&self) -> Self {
        CommandSender {
            tx: self.tx.clone(),
        }
    }
}

impl<S> CommandSender<S> {
    pub fn push<F>(&self, command: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        if self.tx.send(Envelope::Run(Box::new(command))).is_err() {
            warn!(LOG_TAG, "command dropped, consumer thread is gone");
        }
    }
}

/// 命令缓冲区本体
/// 先 new 拿到发送端用于装配，再 run 把状态对象移交给消费线程
pub struct CommandBuffer<S> {
    tx: mpsc::Sender<Envelope<S>>,
    rx: Option<mpsc::Receiver<Envelope<S>>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl<S: Send + 'static> CommandBuffer<S> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel::<Envelope<S>>();
        CommandBuffer {
            tx,
            rx: Some(rx),
            worker: None,
        }
    }

    pub fn sender(&self) -> CommandSender<S> {
        CommandSender {
            tx: self.tx.clone(),
        }
    }

    /// 启动消费线程；run 之前入队的命令会在启动后按顺序执行
    pub fn run(&mut self, mut state: S) {
        let rx = match self.rx.take() {
            Some(rx) => rx,
            None => {
                warn!(LOG_TAG, "command buffer already running");
                return;
            }
        };

        self.worker = Some(thread::spawn(move || {
            while let Ok(envelope) = rx.recv() {
                match envelope {
                    Envelope::Run(command) => command(&mut state),
                    Envelope::Stop => break,
                }
            }
            debug!(LOG_TAG, "command worker exited");
        }));
    }
}

impl<S> CommandBuffer<S> {
    /// 停止消费线程，队列中剩余命令执行完后返回
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.tx.send(Envelope::Stop);
            if worker.join().is_err() {
                warn!(LOG_TAG, "command worker panicked during shutdown");
            }
        }
    }
}

impl<S> Drop for CommandBuffer<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    // 命令按入队顺序执行
    #[test]
    fn test_commands_run_in_fifo_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut buffer = CommandBuffer::<Vec<u32>>::new();
        let sender = buffer.sender();

        for i in 0..100u32 {
            let seen = seen.clone();
            sender.push(move |state: &mut Vec<u32>| {
                state.push(i);
                seen.lock().unwrap().push(i);
            });
        }

        buffer.run(Vec::new());
        buffer.stop();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 100);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    // stop 之前入队的命令全部被执行
    #[test]
    fn test_stop_drains_pending_commands() {
        let counter = Arc::new(Mutex::new(0usize));
        let mut buffer = CommandBuffer::<()>::new();
        buffer.run(());

        let sender = buffer.sender();
        for _ in 0..50 {
            let counter = counter.clone();
            sender.push(move |_| {
                *counter.lock().unwrap() += 1;
            });
        }
        buffer.stop();

        assert_eq!(*counter.lock().unwrap(), 50);
    }

    // 多个生产者线程并发入队不丢命令
    #[test]
    fn test_push_from_multiple_threads() {
        let counter = Arc::new(Mutex::new(0usize));
        let mut buffer = CommandBuffer::<()>::new();
        buffer.run(());
        let sender = buffer.sender();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let sender = sender.clone();
                let counter = counter.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        let counter = counter.clone();
                        sender.push(move |_| {
                            *counter.lock().unwrap() += 1;
                        });
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        buffer.stop();

        assert_eq!(*counter.lock().unwrap(), 100);
    }

    // 停止以后入队的命令被丢弃而不会 panic
    #[test]
    fn test_push_after_stop_is_dropped() {
        let mut buffer = CommandBuffer::<()>::new();
        buffer.run(());
        let sender = buffer.sender();
        buffer.stop();
        sender.push(|_| {});
    }
}
