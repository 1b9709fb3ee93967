//! Per-node sequential dispatch.
//!
//! Every node gets one worker task draining an unbounded FIFO of matching work. Work for one
//! node runs strictly in enqueue order; workers of different nodes run in parallel. A task
//! that panics is logged and does not stop its worker.

use futures::{future::BoxFuture, FutureExt};
use std::{
	collections::HashMap,
	panic::AssertUnwindSafe,
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc,
	},
};
use tokio::{
	sync::{mpsc, watch, Mutex},
	task::JoinHandle,
};
use tracing::{debug, error, info};

/// Unit of work scheduled on a node's queue
pub type DispatchTask = BoxFuture<'static, ()>;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
	#[error("dispatch queue for node '{0}' is closed")]
	Closed(String),
}

struct QueuedTask {
	block_number: u64,
	label: &'static str,
	task: DispatchTask,
}

struct NodeQueue {
	sender: mpsc::UnboundedSender<QueuedTask>,
	pending: Arc<AtomicUsize>,
	worker: JoinHandle<()>,
}

/// Sequential task queues keyed by node name
pub struct DispatchQueues {
	queues: Mutex<HashMap<String, NodeQueue>>,
	shutdown: watch::Receiver<bool>,
}

impl DispatchQueues {
	/// Creates the queues; workers stop when `shutdown` turns true
	pub fn new(shutdown: watch::Receiver<bool>) -> Self {
		Self {
			queues: Mutex::new(HashMap::new()),
			shutdown,
		}
	}

	/// Appends work to a node's queue, starting the node's worker on first use
	///
	/// # Arguments
	/// * `node_name` - Queue to append to
	/// * `block_number` - Block the work belongs to, for logging
	/// * `label` - Short name of the work, for logging
	/// * `task` - The work itself
	pub async fn enqueue(
		&self,
		node_name: &str,
		block_number: u64,
		label: &'static str,
		task: DispatchTask,
	) -> Result<(), DispatchError> {
		let mut queues = self.queues.lock().await;
		if *self.shutdown.borrow() {
			return Err(DispatchError::Closed(node_name.to_string()));
		}

		let queue = queues
			.entry(node_name.to_string())
			.or_insert_with(|| self.spawn_worker(node_name));

		queue.pending.fetch_add(1, Ordering::SeqCst);
		queue
			.sender
			.send(QueuedTask {
				block_number,
				label,
				task,
			})
			.map_err(|_| {
				queue.pending.fetch_sub(1, Ordering::SeqCst);
				DispatchError::Closed(node_name.to_string())
			})
	}

	fn spawn_worker(&self, node_name: &str) -> NodeQueue {
		let (sender, mut receiver) = mpsc::unbounded_channel::<QueuedTask>();
		let pending = Arc::new(AtomicUsize::new(0));
		let mut shutdown = self.shutdown.clone();
		let worker_pending = pending.clone();
		let node = node_name.to_string();

		let worker = tokio::spawn(async move {
			debug!(node = %node, "Dispatch worker started");
			loop {
				let queued = tokio::select! {
					biased;
					_ = shutdown.wait_for(|stop| *stop) => break,
					queued = receiver.recv() => match queued {
						Some(queued) => queued,
						None => break,
					},
				};

				let QueuedTask {
					block_number,
					label,
					task,
				} = queued;
				if AssertUnwindSafe(task).catch_unwind().await.is_err() {
					error!(node = %node, "{} for block {} panicked", label, block_number);
				}
				worker_pending.fetch_sub(1, Ordering::SeqCst);
			}
			debug!(node = %node, "Dispatch worker stopped");
		});

		NodeQueue {
			sender,
			pending,
			worker,
		}
	}

	/// Number of tasks enqueued for a node that have not finished
	pub async fn pending(&self, node_name: &str) -> usize {
		self.queues
			.lock()
			.await
			.get(node_name)
			.map(|queue| queue.pending.load(Ordering::SeqCst))
			.unwrap_or(0)
	}

	/// Closes every queue and waits for the workers to drain what was already enqueued
	pub async fn close(&self) {
		let queues: Vec<(String, NodeQueue)> = self.queues.lock().await.drain().collect();
		for (node, queue) in queues {
			let NodeQueue { sender, worker, .. } = queue;
			drop(sender);
			if let Err(e) = worker.await {
				error!(node = %node, "Dispatch worker failed: {}", e);
			}
		}
		info!("Dispatch queues closed");
	}
}
