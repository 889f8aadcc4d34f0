//! Routing jobs on their own threads. Jobs share no mutable state; each owns its board.

use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};

use log::info;
use thiserror::Error;

use crate::{
    autoroute::{
        batch::{BatchAutorouter, BatchTermination, RoutingStatus},
        engine::AutorouteError,
        observer::EmptyAutorouterObserver,
        stop::StopHandle,
    },
    board::RoutingBoard,
    debug::DebugControl,
    settings::RouterSettings,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error(transparent)]
    Autoroute(#[from] AutorouteError),
    #[error("routing thread panicked")]
    Panicked,
}

#[derive(Debug)]
pub struct RoutingOutcome {
    pub board: RoutingBoard,
    pub termination: BatchTermination,
    pub status: RoutingStatus,
}

pub struct RoutingJob {
    stop: StopHandle,
    debug: Arc<DebugControl>,
    handle: JoinHandle<Result<RoutingOutcome, AutorouteError>>,
}

impl RoutingJob {
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.request_stop();
    }

    pub fn debug_control(&self) -> Arc<DebugControl> {
        self.debug.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn join(self) -> Result<RoutingOutcome, JobError> {
        Ok(self.handle.join().map_err(|_| JobError::Panicked)??)
    }
}

/// Starts routing `board` on a new thread.
pub fn spawn_routing_job(board: RoutingBoard, settings: RouterSettings) -> RoutingJob {
    let stop = StopHandle::new();
    let debug = Arc::new(DebugControl::new(settings.debug.clone()));

    let mut autorouter =
        BatchAutorouter::new_with_controls(board, settings, stop.clone(), debug.clone());

    let handle = thread::spawn(move || {
        autorouter.autoroute_passes(false, &mut EmptyAutorouterObserver)?;

        let termination = autorouter
            .termination()
            .unwrap_or(BatchTermination::Cancelled);
        let status = autorouter.status().unwrap_or(RoutingStatus::Cancelled);
        info!("routing job ended: {:?}, {:?}", termination, status);

        Ok(RoutingOutcome {
            board: autorouter.into_board(),
            termination,
            status,
        })
    });

    RoutingJob {
        stop,
        debug,
        handle,
    }
}
