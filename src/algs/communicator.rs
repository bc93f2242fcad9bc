//! Thin façade over in-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices*. Point-to-point handles are waitable; a receive is
//! only trusted after `.wait()` returned its bytes. The collectives (`broadcast`,
//! `scatter_varcount`, `gather_varcount`, `all_reduce_max`, `barrier`) are provided on top of
//! `isend`/`irecv` and rely on per-(source, destination, tag) FIFO delivery, so two collectives
//! issued in the same order on every rank never overtake each other. The MPI backend replaces
//! them with the native collectives.

use crate::algs::wire::expect_exact_len;
use crate::apsp_error::ApspError;
use bytes::Bytes;
use dashmap::DashMap;
use hashbrown::HashMap;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Message tag. The `0xFF01..` range belongs to the provided collectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommTag(u16);

impl CommTag {
    pub const BROADCAST: CommTag = CommTag(0xFF01);
    pub const SCATTER: CommTag = CommTag(0xFF02);
    pub const GATHER: CommTag = CommTag(0xFF03);

    pub const fn new(tag: u16) -> Self {
        CommTag(tag)
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Message-passing interface used by every distributed algorithm in this crate.
pub trait Communicator: Sized {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: CommTag, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive of `buf.len()` bytes; the data is returned by `wait`, not written to `buf`.
    fn irecv(&self, peer: usize, tag: CommTag, buf: &mut [u8]) -> Self::RecvHandle;

    /// Collective: partition the members by `color`, ordering each part by `(key, rank)`.
    fn split(&self, color: usize, key: usize) -> Result<Self, ApspError>;

    /// Tear down every rank of the run with `code`.
    fn abort(&self, code: i32) -> !;

    /// Collective: returns once every member has entered.
    fn barrier(&self) -> Result<(), ApspError> {
        self.all_reduce_max(0).map(|_| ())
    }

    /// Collective: `root`'s `buf` is copied into every other member's `buf`.
    fn broadcast(&self, root: usize, buf: &mut [u8]) -> Result<(), ApspError> {
        if self.rank() == root {
            for peer in (0..self.size()).filter(|&p| p != root) {
                self.isend(peer, CommTag::BROADCAST, buf).wait();
            }
        } else {
            let len = buf.len();
            let data = self
                .irecv(root, CommTag::BROADCAST, buf)
                .wait()
                .ok_or_else(|| lost_peer(root, "broadcast"))?;
            expect_exact_len(data.len(), len).map_err(ApspError::Wire)?;
            buf.copy_from_slice(&data);
        }
        Ok(())
    }

    /// Collective: `root` sends `counts[r]` bytes of `send` (packed in rank order) to rank `r`.
    /// `send` is only read on the root.
    fn scatter_varcount(
        &self,
        root: usize,
        send: &[u8],
        counts: &[usize],
        recv: &mut [u8],
    ) -> Result<(), ApspError> {
        check_counts(self.size(), counts)?;
        expect_exact_len(recv.len(), counts[self.rank()]).map_err(ApspError::Wire)?;
        if self.rank() == root {
            expect_exact_len(send.len(), counts.iter().sum()).map_err(ApspError::Wire)?;
            for (peer, range) in displacements(counts).into_iter().enumerate() {
                if peer == root {
                    recv.copy_from_slice(&send[range]);
                } else {
                    self.isend(peer, CommTag::SCATTER, &send[range]).wait();
                }
            }
        } else {
            let len = recv.len();
            let data = self
                .irecv(root, CommTag::SCATTER, recv)
                .wait()
                .ok_or_else(|| lost_peer(root, "scatter"))?;
            expect_exact_len(data.len(), len).map_err(ApspError::Wire)?;
            recv.copy_from_slice(&data);
        }
        Ok(())
    }

    /// Collective: every rank sends `counts[rank]` bytes; `root` receives them packed in rank
    /// order into `recv`. `recv` is only written on the root.
    fn gather_varcount(
        &self,
        root: usize,
        send: &[u8],
        counts: &[usize],
        recv: &mut [u8],
    ) -> Result<(), ApspError> {
        check_counts(self.size(), counts)?;
        expect_exact_len(send.len(), counts[self.rank()]).map_err(ApspError::Wire)?;
        if self.rank() == root {
            expect_exact_len(recv.len(), counts.iter().sum()).map_err(ApspError::Wire)?;
            for (peer, range) in displacements(counts).into_iter().enumerate() {
                if peer == root {
                    recv[range].copy_from_slice(send);
                    continue;
                }
                let len = range.len();
                let data = self
                    .irecv(peer, CommTag::GATHER, &mut recv[range.clone()])
                    .wait()
                    .ok_or_else(|| lost_peer(peer, "gather"))?;
                expect_exact_len(data.len(), len).map_err(ApspError::Wire)?;
                recv[range].copy_from_slice(&data);
            }
        } else {
            self.isend(root, CommTag::GATHER, send).wait();
        }
        Ok(())
    }

    /// Collective: maximum of `x` over all members, returned on every member.
    fn all_reduce_max(&self, x: u64) -> Result<u64, ApspError> {
        let size = self.size();
        let counts = vec![8; size];
        let mut all = if self.rank() == 0 {
            vec![0u8; 8 * size]
        } else {
            Vec::new()
        };
        self.gather_varcount(0, &x.to_le_bytes(), &counts, &mut all)?;
        let mut out = [0u8; 8];
        if self.rank() == 0 {
            let max = all
                .chunks_exact(8)
                .map(|c| u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                .max()
                .unwrap_or(0);
            out = max.to_le_bytes();
        }
        self.broadcast(0, &mut out)?;
        Ok(u64::from_le_bytes(out))
    }
}

/// Byte ranges of each rank's slot in a packed buffer.
pub fn displacements(counts: &[usize]) -> Vec<std::ops::Range<usize>> {
    let mut at = 0;
    counts
        .iter()
        .map(|&c| {
            let r = at..at + c;
            at += c;
            r
        })
        .collect()
}

fn check_counts(size: usize, counts: &[usize]) -> Result<(), ApspError> {
    if counts.len() == size {
        Ok(())
    } else {
        Err(ApspError::Wire(format!(
            "expected {size} per-rank counts, got {}",
            counts.len()
        )))
    }
}

fn lost_peer(peer: usize, op: &str) -> ApspError {
    ApspError::Comm(format!("rank {peer} left before completing {op}"))
}

// --- LocalComm: one thread per rank inside a single process ---

type Key = (usize, usize, u16); // (src, dst, tag)

struct Hub {
    size: usize,
    mailbox: DashMap<Key, VecDeque<Bytes>>,
    lock: Mutex<()>,
    ready: Condvar,
    departed: Vec<AtomicBool>,
    aborted: AtomicBool,
    splits: Mutex<HashMap<(u64, usize), Arc<Hub>>>,
}

impl Hub {
    fn new(size: usize) -> Arc<Self> {
        Arc::new(Self {
            size,
            mailbox: DashMap::new(),
            lock: Mutex::new(()),
            ready: Condvar::new(),
            departed: (0..size).map(|_| AtomicBool::new(false)).collect(),
            aborted: AtomicBool::new(false),
            splits: Mutex::new(HashMap::new()),
        })
    }

    fn post(&self, key: Key, data: Bytes) {
        self.mailbox.entry(key).or_default().push_back(data);
        self.wake();
    }

    fn wake(&self) {
        let _g = self.lock.lock();
        self.ready.notify_all();
    }

    fn try_take(&self, key: &Key) -> Option<Bytes> {
        self.mailbox.get_mut(key).and_then(|mut q| q.pop_front())
    }

    /// Block until a message for `key` arrives; `None` if the sender left without sending it.
    fn take(&self, key: Key) -> Option<Bytes> {
        if let Some(b) = self.try_take(&key) {
            return Some(b);
        }
        let mut g = self.lock.lock();
        loop {
            let gone = self.departed[key.0].load(Ordering::SeqCst);
            if let Some(b) = self.try_take(&key) {
                return Some(b);
            }
            if gone || self.aborted.load(Ordering::SeqCst) {
                return None;
            }
            self.ready.wait(&mut g);
        }
    }
}

/// Receive handle of [`LocalComm`]; blocks in `wait`.
pub struct LocalHandle {
    hub: Arc<Hub>,
    key: Key,
    len: usize,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        let bytes = self.hub.take(self.key)?;
        if bytes.len() != self.len {
            log::warn!(
                "local recv {:?}: posted {} bytes, message has {}",
                self.key,
                self.len,
                bytes.len()
            );
        }
        Some(bytes.to_vec())
    }
}

/// In-process communicator: every rank is a thread sharing one mailbox.
///
/// Dropping a rank's communicator marks it departed, so peers still waiting on it get `None`
/// from `wait` instead of blocking forever.
pub struct LocalComm {
    rank: usize,
    hub: Arc<Hub>,
    split_epoch: AtomicU64,
}

impl LocalComm {
    /// Communicators for ranks `0..size`, to be moved onto one thread each.
    pub fn world(size: usize) -> Vec<LocalComm> {
        let hub = Hub::new(size);
        (0..size)
            .map(|rank| LocalComm {
                rank,
                hub: hub.clone(),
                split_epoch: AtomicU64::new(0),
            })
            .collect()
    }
}

impl Drop for LocalComm {
    fn drop(&mut self) {
        self.hub.departed[self.rank].store(true, Ordering::SeqCst);
        self.hub.wake();
    }
}

impl Communicator for LocalComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.hub.size
    }

    fn isend(&self, peer: usize, tag: CommTag, buf: &[u8]) -> Self::SendHandle {
        self.hub
            .post((self.rank, peer, tag.as_u16()), Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: CommTag, buf: &mut [u8]) -> Self::RecvHandle {
        LocalHandle {
            hub: self.hub.clone(),
            key: (peer, self.rank, tag.as_u16()),
            len: buf.len(),
        }
    }

    fn split(&self, color: usize, key: usize) -> Result<Self, ApspError> {
        let epoch = self.split_epoch.fetch_add(1, Ordering::SeqCst);
        let size = self.size();

        // every member learns every (color, key)
        let mine: Vec<u8> = [color as u64, key as u64]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let mut table = vec![0u8; 16 * size];
        self.gather_varcount(0, &mine, &vec![16; size], &mut table)?;
        self.broadcast(0, &mut table)?;

        let read = |b: &[u8]| u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]);
        let mut members: Vec<(u64, usize)> = table
            .chunks_exact(16)
            .enumerate()
            .filter(|(_, e)| read(&e[..8]) == color as u64)
            .map(|(r, e)| (read(&e[8..]), r))
            .collect();
        members.sort_unstable();
        let new_rank = members
            .iter()
            .position(|&(_, r)| r == self.rank)
            .ok_or_else(|| ApspError::Comm(format!("rank {} missing from its split", self.rank)))?;

        let hub = self
            .hub
            .splits
            .lock()
            .entry((epoch, color))
            .or_insert_with(|| Hub::new(members.len()))
            .clone();
        Ok(LocalComm {
            rank: new_rank,
            hub,
            split_epoch: AtomicU64::new(0),
        })
    }

    fn abort(&self, code: i32) -> ! {
        self.hub.aborted.store(true, Ordering::SeqCst);
        self.hub.wake();
        panic!("rank {} aborted the local run with code {code}", self.rank);
    }
}

/// Run `f` on `procs` local ranks, one thread each, and return every rank's result in rank
/// order. A panic on any rank is re-raised on the caller.
pub fn run_local<T, F>(procs: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(LocalComm) -> T + Sync,
{
    let comms = LocalComm::world(procs);
    std::thread::scope(|s| {
        let f = &f;
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| s.spawn(move || f(comm)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::*;
    use mpi::Count;
    use mpi::collective::SystemOperation;
    use mpi::datatype::{Partition, PartitionMut};
    use mpi::environment::Universe;
    use mpi::topology::{Color, SimpleCommunicator};
    use mpi::traits::*;

    /// World (or split) communicator of an MPI job.
    ///
    /// Point-to-point calls complete eagerly: `isend` is a standard blocking send and `irecv`
    /// receives in the call, so handles are already complete when returned.
    pub struct MpiComm {
        pub world: SimpleCommunicator,
        pub rank: usize,
        pub size: usize,
        // dropped last: finalizes MPI
        _universe: Option<Universe>,
    }

    impl MpiComm {
        pub fn new() -> Result<Self, ApspError> {
            let universe = mpi::initialize()
                .ok_or_else(|| ApspError::Comm("MPI was already initialized".into()))?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Ok(Self {
                world,
                rank,
                size,
                _universe: Some(universe),
            })
        }

        fn as_counts(counts: &[usize]) -> (Vec<Count>, Vec<Count>) {
            let c: Vec<Count> = counts.iter().map(|&x| x as Count).collect();
            let d = displacements(counts)
                .into_iter()
                .map(|r| r.start as Count)
                .collect();
            (c, d)
        }
    }

    pub struct MpiDone(Option<Vec<u8>>);

    impl Wait for MpiDone {
        fn wait(self) -> Option<Vec<u8>> {
            self.0
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = MpiDone;
        type RecvHandle = MpiDone;

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: CommTag, buf: &[u8]) -> MpiDone {
            self.world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, tag.as_u16() as i32);
            MpiDone(None)
        }

        fn irecv(&self, peer: usize, tag: CommTag, _buf: &mut [u8]) -> MpiDone {
            let (data, _status) = self
                .world
                .process_at_rank(peer as i32)
                .receive_vec_with_tag::<u8>(tag.as_u16() as i32);
            MpiDone(Some(data))
        }

        fn split(&self, color: usize, key: usize) -> Result<Self, ApspError> {
            let sub = self
                .world
                .split_by_color_with_key(Color::with_value(color as i32), key as i32)
                .ok_or_else(|| ApspError::Comm(format!("split by color {color} failed")))?;
            let rank = sub.rank() as usize;
            let size = sub.size() as usize;
            Ok(Self {
                world: sub,
                rank,
                size,
                _universe: None,
            })
        }

        fn abort(&self, code: i32) -> ! {
            self.world.abort(code)
        }

        fn barrier(&self) -> Result<(), ApspError> {
            self.world.barrier();
            Ok(())
        }

        fn broadcast(&self, root: usize, buf: &mut [u8]) -> Result<(), ApspError> {
            self.world.process_at_rank(root as i32).broadcast_into(buf);
            Ok(())
        }

        fn scatter_varcount(
            &self,
            root: usize,
            send: &[u8],
            counts: &[usize],
            recv: &mut [u8],
        ) -> Result<(), ApspError> {
            check_counts(self.size, counts)?;
            expect_exact_len(recv.len(), counts[self.rank]).map_err(ApspError::Wire)?;
            let root_proc = self.world.process_at_rank(root as i32);
            if self.rank == root {
                expect_exact_len(send.len(), counts.iter().sum()).map_err(ApspError::Wire)?;
                let (c, d) = Self::as_counts(counts);
                let partition = Partition::new(send, &c[..], &d[..]);
                root_proc.scatter_varcount_into_root(&partition, recv);
            } else {
                root_proc.scatter_varcount_into(recv);
            }
            Ok(())
        }

        fn gather_varcount(
            &self,
            root: usize,
            send: &[u8],
            counts: &[usize],
            recv: &mut [u8],
        ) -> Result<(), ApspError> {
            check_counts(self.size, counts)?;
            expect_exact_len(send.len(), counts[self.rank]).map_err(ApspError::Wire)?;
            let root_proc = self.world.process_at_rank(root as i32);
            if self.rank == root {
                expect_exact_len(recv.len(), counts.iter().sum()).map_err(ApspError::Wire)?;
                let (c, d) = Self::as_counts(counts);
                let mut partition = PartitionMut::new(recv, &c[..], &d[..]);
                root_proc.gather_varcount_into_root(send, &mut partition);
            } else {
                root_proc.gather_varcount_into(send);
            }
            Ok(())
        }

        fn all_reduce_max(&self, x: u64) -> Result<u64, ApspError> {
            let mut out = 0u64;
            self.world
                .all_reduce_into(&x, &mut out, SystemOperation::max());
            Ok(out)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
