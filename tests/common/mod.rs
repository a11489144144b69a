//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use faucet_dispatch::{Faucet, TransactionId, TransferError, TransferSink};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const SENDER: &str = "0x00000000000000000000000000000000000000aa";

/// Sink that records destinations and can hold transfers until released.
#[derive(Debug)]
pub struct RecordingSink {
    decimals: u32,
    destinations: Mutex<Vec<String>>,
    amounts: Mutex<Vec<u128>>,
    failures: Mutex<VecDeque<TransferError>>,
    gate: Option<Semaphore>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(18, None))
    }

    pub fn with_decimals(decimals: u32) -> Arc<Self> {
        Arc::new(Self::build(decimals, None))
    }

    /// Every transfer waits for one `release` before completing.
    pub fn gated() -> Arc<Self> {
        Arc::new(Self::build(18, Some(Semaphore::new(0))))
    }

    fn build(decimals: u32, gate: Option<Semaphore>) -> Self {
        Self {
            decimals,
            destinations: Mutex::new(Vec::new()),
            amounts: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            gate,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Let `n` gated transfers complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn fail_next(&self, error: TransferError) {
        self.failures.lock().push_back(error);
    }

    pub fn destinations(&self) -> Vec<String> {
        self.destinations.lock().clone()
    }

    pub fn amounts(&self) -> Vec<u128> {
        self.amounts.lock().clone()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransferSink for RecordingSink {
    fn sender(&self) -> &str {
        SENDER
    }

    fn decimals(&self) -> u32 {
        self.decimals
    }

    async fn transfer(
        &self,
        destination: &str,
        amount: u128,
    ) -> Result<TransactionId, TransferError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);
        let flight = InFlight(&self.in_flight);

        let seq = {
            let mut destinations = self.destinations.lock();
            destinations.push(destination.to_string());
            destinations.len()
        };
        self.amounts.lock().push(amount);

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        drop(flight);
        match self.failures.lock().pop_front() {
            Some(error) => Err(error),
            None => Ok(TransactionId::new(format!("0x{:064x}", seq))),
        }
    }
}

/// Wait until `condition` holds, polling every few milliseconds.
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

/// A running HTTP server for a faucet.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: CancellationToken,
    pub task: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub async fn start(faucet: Arc<Faucet>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(faucet_dispatch::infrastructure::http::serve(
            listener,
            faucet,
            shutdown.clone(),
        ));
        Self {
            addr,
            shutdown,
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        self.task.await.unwrap().unwrap();
    }
}
