use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use tracing::debug;

use crate::error::LandscapeError;

pub enum LoadPoll<T> {
    Idle,
    Pending,
    Ready(Result<T, LandscapeError>),
}

/// Runs one load at a time on a worker thread. A request made while another
/// is in flight is ignored.
pub struct Loader<T> {
    rx: Option<Receiver<Result<T, LandscapeError>>>,
}

impl<T> Default for Loader<T> {
    fn default() -> Self {
        Self { rx: None }
    }
}

impl<T: Send + 'static> Loader<T> {
    /// Starts `job` unless a load is already running. Returns whether it
    /// started.
    pub fn request<F>(&mut self, job: F) -> bool
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    {
        if self.rx.is_some() {
            debug!("load already in flight; request ignored");
            return false;
        }

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = job().map_err(|error| LandscapeError::data_load(&error));
            let _ = tx.send(result);
        });
        self.rx = Some(rx);
        true
    }

    pub fn poll(&mut self) -> LoadPoll<T> {
        let Some(rx) = self.rx.take() else {
            return LoadPoll::Idle;
        };
        match rx.try_recv() {
            Ok(result) => LoadPoll::Ready(result),
            Err(TryRecvError::Empty) => {
                self.rx = Some(rx);
                LoadPoll::Pending
            }
            Err(TryRecvError::Disconnected) => LoadPoll::Ready(Err(LandscapeError::DataLoad(
                "background load worker disconnected".to_owned(),
            ))),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.rx.is_some()
    }

    /// Forgets the running load; its result is dropped when it arrives.
    pub fn cancel(&mut self) {
        if self.rx.take().is_some() {
            debug!("in-flight load cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait<T: Send + 'static>(loader: &mut Loader<T>) -> Result<T, LandscapeError> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match loader.poll() {
                LoadPoll::Ready(result) => return result,
                LoadPoll::Pending if Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(2));
                }
                LoadPoll::Pending => panic!("load did not finish"),
                LoadPoll::Idle => panic!("nothing was loading"),
            }
        }
    }

    #[test]
    fn second_request_is_ignored_while_in_flight() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let mut loader = Loader::default();
        assert!(loader.request(move || {
            let _ = release_rx.recv();
            Ok(1)
        }));
        assert!(!loader.request(|| Ok(2)));
        assert!(loader.is_loading());
        assert!(matches!(loader.poll(), LoadPoll::Pending));

        release_tx.send(()).unwrap();
        assert_eq!(wait(&mut loader), Ok(1));
        assert!(!loader.is_loading());
        assert!(matches!(loader.poll(), LoadPoll::Idle));

        assert!(loader.request(|| Ok(3)));
        assert_eq!(wait(&mut loader), Ok(3));
    }

    #[test]
    fn failures_become_data_load_errors() {
        let mut loader: Loader<()> = Loader::default();
        loader.request(|| Err(anyhow::anyhow!("connection refused").context("fetching sheet")));
        match wait(&mut loader) {
            Err(LandscapeError::DataLoad(message)) => {
                assert_eq!(message, "fetching sheet: connection refused");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cancel_allows_a_fresh_request() {
        let (_hold, blocked) = mpsc::channel::<()>();
        let mut loader = Loader::default();
        loader.request(move || {
            let _ = blocked.recv_timeout(Duration::from_millis(50));
            Ok("stale")
        });
        loader.cancel();
        assert!(!loader.is_loading());
        assert!(loader.request(|| Ok("fresh")));
        assert_eq!(wait(&mut loader), Ok("fresh"));
    }
}
