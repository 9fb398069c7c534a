//! Channel-connected actors with a uniform lifecycle.
//!
//! An actor owns its output channels and closes them by dropping them when
//! its `run` returns, which is how termination cascades through the graph:
//! downstream actors observe the closure as end of input and exit in turn.
//! Every blocking send and receive selects against cancellation, so a failed
//! actor brings the whole run down promptly once the runner cancels.

pub(crate) trait Actor: Send {
    fn name(&self) -> &'static str;

    fn run(self: Box<Self>, stop: &Stop) -> anyhow::Result<()>;
}

/// Runs every actor on its own thread and waits for all of them.
///
/// The first failure cancels the shared [`Stop`] handle so the remaining
/// actors abort promptly; the returned error is the first one that was not
/// itself a cancellation.
pub(crate) fn run_all(actors: Vec<Box<dyn Actor + '_>>) -> anyhow::Result<()> {
    let (handle, stop) = stop_pair();
    let mut handle = Some(handle);

    thread::scope(|scope| {
        let (done_tx, done_rx) = channel::unbounded();
        for actor in actors {
            let done_tx = done_tx.clone();
            let stop = stop.clone();
            scope.spawn(move || {
                let name = actor.name();
                let res = actor.run(&stop);
                // The runner outlives every actor, so this cannot fail.
                let _ = done_tx.send((name, res));
            });
        }
        drop(done_tx);

        let mut first: Option<anyhow::Error> = None;
        for (name, res) in done_rx {
            match res {
                Ok(()) => log::debug!("actor `{name}` finished"),
                Err(e) => {
                    if !is_cancelled(&e) {
                        if let Some(handle) = handle.take() {
                            handle.cancel();
                        }
                    }
                    let replace = match &first {
                        None => true,
                        Some(old) => is_cancelled(old) && !is_cancelled(&e),
                    };
                    if replace {
                        first = Some(e);
                    }
                }
            }
        }
        match first {
            None => Ok(()),
            Some(e) => Err(e),
        }
    })
}

/// A value that cannot exist; the stop channel only ever closes.
enum Never {}

/// Observer half of the process-wide cancellation handle.
#[derive(Clone)]
pub(crate) struct Stop {
    rx: channel::Receiver<Never>,
}

impl Stop {
    /// Errors with [`Error::Cancelled`] once the run has been cancelled.
    pub(crate) fn check(&self) -> anyhow::Result<()> {
        match self.rx.try_recv() {
            Err(channel::TryRecvError::Empty) => Ok(()),
            Err(channel::TryRecvError::Disconnected) => Err(Error::Cancelled.into()),
            Ok(never) => match never {},
        }
    }
}

pub(crate) struct StopHandle {
    _tx: channel::Sender<Never>,
}

impl StopHandle {
    pub(crate) fn cancel(self) {}
}

pub(crate) fn stop_pair() -> (StopHandle, Stop) {
    let (tx, rx) = channel::bounded(0);
    (StopHandle { _tx: tx }, Stop { rx })
}

/// Sending half of an inter-actor channel. Zero capacity: a send completes
/// only when a consumer is ready, so a slow sink paces its whole upstream.
pub(crate) struct Tx<T>(channel::Sender<T>);

impl<T> Tx<T> {
    pub(crate) fn send(&self, stop: &Stop, value: T) -> anyhow::Result<()> {
        let tx = &self.0;
        let cancelled = &stop.rx;
        select! {
            send(tx, value) -> res => res.map_err(|_| Error::Cancelled.into()),
            recv(cancelled) -> msg => match msg {
                Ok(never) => match never {},
                Err(_) => Err(Error::Cancelled.into()),
            },
        }
    }
}

/// Receiving half of an inter-actor channel. Shared by all of an actor's
/// workers; the channel itself provides the mutual exclusion.
pub(crate) struct Rx<T>(channel::Receiver<T>);

impl<T> Rx<T> {
    /// `Ok(None)` means the upstream actor has exited and closed the channel.
    pub(crate) fn recv(&self, stop: &Stop) -> anyhow::Result<Option<T>> {
        let rx = &self.0;
        let cancelled = &stop.rx;
        select! {
            recv(rx) -> res => Ok(res.ok()),
            recv(cancelled) -> msg => match msg {
                Ok(never) => match never {},
                Err(_) => Err(Error::Cancelled.into()),
            },
        }
    }
}

pub(crate) fn pipe<T>() -> (Tx<T>, Rx<T>) {
    let (tx, rx) = channel::bounded(0);
    (Tx(tx), Rx(rx))
}

/// Output-only actor: `produce` is called repeatedly, under a lock when the
/// worker count exceeds one. `Ok(Some(v))` emits downstream, `Ok(None)`
/// terminates the calling worker cleanly, `Err` is fatal.
pub(crate) struct Source<T, F> {
    name: &'static str,
    workers: usize,
    produce: Mutex<F>,
    output: Tx<T>,
}

pub(crate) fn source<T, F>(
    name: &'static str,
    workers: usize,
    output: Tx<T>,
    produce: F,
) -> Source<T, F>
where
    F: FnMut(&Stop) -> anyhow::Result<Option<T>>,
{
    Source {
        name,
        workers,
        produce: Mutex::new(produce),
        output,
    }
}

impl<T, F> Actor for Source<T, F>
where
    T: Send,
    F: FnMut(&Stop) -> anyhow::Result<Option<T>> + Send,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(self: Box<Self>, stop: &Stop) -> anyhow::Result<()> {
        let Self {
            name,
            workers,
            produce,
            output,
        } = *self;
        run_workers(name, workers, || loop {
            stop.check()?;
            let item = (&mut *produce.lock().unwrap())(stop)?;
            match item {
                Some(value) => output.send(stop, value)?,
                None => return Ok(()),
            }
        })
    }
}

/// Input-only actor: `each` runs per element; `done`, if any, runs once after
/// the input channel is observed closed and every worker has exited cleanly.
pub(crate) struct Sink<T, F, G> {
    name: &'static str,
    workers: usize,
    input: Rx<T>,
    each: F,
    done: Option<G>,
}

pub(crate) type NoDone = fn(&Stop) -> anyhow::Result<()>;

pub(crate) fn sink<T, F>(
    name: &'static str,
    workers: usize,
    input: Rx<T>,
    each: F,
) -> Sink<T, F, NoDone>
where
    F: Fn(&Stop, T) -> anyhow::Result<()> + Sync,
{
    Sink {
        name,
        workers,
        input,
        each,
        done: None,
    }
}

pub(crate) fn sink_then<T, F, G>(
    name: &'static str,
    workers: usize,
    input: Rx<T>,
    each: F,
    done: G,
) -> Sink<T, F, G>
where
    F: Fn(&Stop, T) -> anyhow::Result<()> + Sync,
    G: FnOnce(&Stop) -> anyhow::Result<()>,
{
    Sink {
        name,
        workers,
        input,
        each,
        done: Some(done),
    }
}

impl<T, F, G> Actor for Sink<T, F, G>
where
    T: Send,
    F: Fn(&Stop, T) -> anyhow::Result<()> + Send + Sync,
    G: FnOnce(&Stop) -> anyhow::Result<()> + Send,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(self: Box<Self>, stop: &Stop) -> anyhow::Result<()> {
        let Self {
            name,
            workers,
            input,
            each,
            done,
        } = *self;
        run_workers(name, workers, || loop {
            match input.recv(stop)? {
                Some(value) => each(stop, value)?,
                None => return Ok(()),
            }
        })?;
        if let Some(done) = done {
            done(stop).with_context(|| format!("actor `{name}` failed"))?;
        }
        Ok(())
    }
}

/// Transforming actor: like [`Sink`] but `map` returns a value emitted on an
/// owned output channel, closed when the actor exits.
pub(crate) struct Map<T, U, F> {
    name: &'static str,
    workers: usize,
    input: Rx<T>,
    output: Tx<U>,
    map: F,
}

pub(crate) fn map<T, U, F>(
    name: &'static str,
    workers: usize,
    input: Rx<T>,
    output: Tx<U>,
    map: F,
) -> Map<T, U, F>
where
    F: Fn(&Stop, T) -> anyhow::Result<U> + Sync,
{
    Map {
        name,
        workers,
        input,
        output,
        map,
    }
}

impl<T, U, F> Actor for Map<T, U, F>
where
    T: Send,
    U: Send,
    F: Fn(&Stop, T) -> anyhow::Result<U> + Send + Sync,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(self: Box<Self>, stop: &Stop) -> anyhow::Result<()> {
        let Self {
            name,
            workers,
            input,
            output,
            map,
        } = *self;
        run_workers(name, workers, || loop {
            match input.recv(stop)? {
                Some(value) => output.send(stop, map(stop, value)?)?,
                None => return Ok(()),
            }
        })
    }
}

/// Broadcasts every received element to each output in sequence, so the
/// slowest consumer paces the others.
pub(crate) struct FanOut<T> {
    name: &'static str,
    input: Rx<T>,
    outputs: Vec<Tx<T>>,
}

pub(crate) fn fan_out<T: Clone>(
    name: &'static str,
    input: Rx<T>,
    outputs: Vec<Tx<T>>,
) -> FanOut<T> {
    FanOut {
        name,
        input,
        outputs,
    }
}

impl<T: Clone + Send> Actor for FanOut<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(self: Box<Self>, stop: &Stop) -> anyhow::Result<()> {
        let Self {
            name,
            input,
            outputs,
        } = *self;
        run_workers(name, 1, || {
            while let Some(value) = input.recv(stop)? {
                for output in &outputs {
                    output.send(stop, value.clone())?;
                }
            }
            Ok(())
        })
    }
}

/// Runs `work` on `workers` parallel threads and waits for all of them,
/// returning the first non-cancellation error (or the first cancellation if
/// that is all there is), wrapped with the actor's name.
fn run_workers(
    name: &'static str,
    workers: usize,
    work: impl Fn() -> anyhow::Result<()> + Sync,
) -> anyhow::Result<()> {
    let mut first: Option<anyhow::Error> = None;
    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers.max(1)).map(|_| scope.spawn(&work)).collect();
        for handle in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    let replace = match &first {
                        None => true,
                        Some(old) => is_cancelled(old) && !is_cancelled(&e),
                    };
                    if replace {
                        first = Some(e);
                    }
                }
                Err(panic) => panic::resume_unwind(panic),
            }
        }
    });
    match first {
        None => Ok(()),
        Some(e) => Err(e.context(format!("actor `{name}` failed"))),
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn stop_check_fails_after_cancel() {
        let (handle, stop) = stop_pair();
        assert!(stop.check().is_ok());
        handle.cancel();
        let err = stop.check().unwrap_err();
        assert!(is_cancelled(&err));
    }

    #[test]
    fn blocked_send_observes_cancellation() {
        let (handle, stop) = stop_pair();
        let (tx, _rx) = pipe::<i32>();
        thread::scope(|scope| {
            let sender = scope.spawn(|| tx.send(&stop, 1));
            thread::sleep(Duration::from_millis(50));
            handle.cancel();
            let err = sender.join().unwrap().unwrap_err();
            assert!(is_cancelled(&err));
        });
    }

    #[test]
    fn blocked_recv_observes_cancellation() {
        let (handle, stop) = stop_pair();
        let (_tx, rx) = pipe::<i32>();
        thread::scope(|scope| {
            let receiver = scope.spawn(|| rx.recv(&stop));
            thread::sleep(Duration::from_millis(50));
            handle.cancel();
            let err = receiver.join().unwrap().unwrap_err();
            assert!(is_cancelled(&err));
        });
    }

    #[test]
    fn chain_maps_and_terminates() {
        let (numbers_tx, numbers_rx) = pipe();
        let (doubled_tx, doubled_rx) = pipe();
        let seen = Mutex::new(Vec::new());

        let mut next = 0;
        let actors: Vec<Box<dyn Actor + '_>> = vec![
            Box::new(source("numbers", 1, numbers_tx, move |_| {
                next += 1;
                Ok((next <= 100).then_some(next))
            })),
            Box::new(map("double", 4, numbers_rx, doubled_tx, |_, n: i32| {
                Ok(n * 2)
            })),
            Box::new(sink("collect", 4, doubled_rx, |_, n: i32| {
                seen.lock().unwrap().push(n);
                Ok(())
            })),
        ];
        run_all(actors).unwrap();

        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();
        assert_eq!(seen, (1..=100).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn end_of_input_callback_runs_once_after_drain() {
        let (tx, rx) = pipe();
        let count = Mutex::new(0);
        let done_sees_all = Mutex::new(false);

        let mut next = 0;
        let actors: Vec<Box<dyn Actor + '_>> = vec![
            Box::new(source("numbers", 1, tx, move |_| {
                next += 1;
                Ok((next <= 10).then_some(next))
            })),
            Box::new(sink_then(
                "count",
                3,
                rx,
                |_, _: i32| {
                    *count.lock().unwrap() += 1;
                    Ok(())
                },
                |_| {
                    *done_sees_all.lock().unwrap() = *count.lock().unwrap() == 10;
                    Ok(())
                },
            )),
        ];
        run_all(actors).unwrap();
        assert!(done_sees_all.into_inner().unwrap());
    }

    #[test]
    fn fan_out_broadcasts_to_every_output() {
        let (in_tx, in_rx) = pipe();
        let (a_tx, a_rx) = pipe();
        let (b_tx, b_rx) = pipe();
        let a = Mutex::new(Vec::new());
        let b = Mutex::new(Vec::new());

        let mut next = 0;
        let actors: Vec<Box<dyn Actor + '_>> = vec![
            Box::new(source("numbers", 1, in_tx, move |_| {
                next += 1;
                Ok((next <= 5).then_some(next))
            })),
            Box::new(fan_out("split", in_rx, vec![a_tx, b_tx])),
            Box::new(sink("a", 1, a_rx, |_, n: i32| {
                a.lock().unwrap().push(n);
                Ok(())
            })),
            Box::new(sink("b", 1, b_rx, |_, n: i32| {
                b.lock().unwrap().push(n);
                Ok(())
            })),
        ];
        run_all(actors).unwrap();

        assert_eq!(a.into_inner().unwrap(), vec![1, 2, 3, 4, 5]);
        assert_eq!(b.into_inner().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn first_real_error_wins_over_cancellations() {
        let (tx, rx) = pipe();

        let mut next = 0;
        let actors: Vec<Box<dyn Actor + '_>> = vec![
            Box::new(source("numbers", 1, tx, move |_| {
                next += 1;
                Ok(Some(next))
            })),
            Box::new(sink("explode", 1, rx, |_, n: i32| {
                if n == 3 {
                    bail!("number three is unacceptable")
                }
                Ok(())
            })),
        ];
        let err = run_all(actors).unwrap_err();
        assert!(!is_cancelled(&err));
        assert!(format!("{err:?}").contains("number three is unacceptable"));
        assert!(format!("{err:?}").contains("actor `explode` failed"));
    }

    use super::fan_out;
    use super::map;
    use super::pipe;
    use super::run_all;
    use super::sink;
    use super::sink_then;
    use super::source;
    use super::stop_pair;
    use super::Actor;
    use crate::error::is_cancelled;
    use anyhow::bail;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;
}

use crate::error::is_cancelled;
use crate::error::Error;
use anyhow::Context as _;
use crossbeam::channel;
use crossbeam::select;
use std::panic;
use std::sync::Mutex;
use std::thread;
