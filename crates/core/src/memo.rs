//! Identity-keyed memoization.
//!
//! A [`Memo`] is a trie with one level per positional argument. `Arc` arguments
//! are keyed by pointer identity, never by content: two structurally equal
//! snapshots occupy different branches. Plain values (ids, numbers) are keyed by
//! value. The value cached for a tuple is stored on the terminal node, so the
//! same tuple always yields a clone of the same `R` (for `R = Arc<_>`, the same
//! allocation).

use std::any::Any;
use std::collections::HashMap;
use std::convert::Infallible;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

/// One argument position as the trie sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Ptr(usize),
    Str(Box<str>),
    Int(i128),
    Bool(bool),
}

type Anchor = Weak<dyn Any + Send + Sync>;

/// A key part plus, for identity keys, a weak handle on the keyed object.
///
/// The weak handle keeps the allocation (and so the address) reserved while the
/// entry exists, which rules out a new object being mistaken for a dead one.
pub struct Key {
    part: KeyPart,
    anchor: Option<Anchor>,
}

impl Key {
    pub fn value(part: KeyPart) -> Self {
        Self { part, anchor: None }
    }

    pub fn identity<T: Send + Sync + 'static>(value: &Arc<T>) -> Self {
        let weak: Weak<T> = Arc::downgrade(value);
        let anchor: Anchor = weak;
        Self {
            part: KeyPart::Ptr(Arc::as_ptr(value) as *const () as usize),
            anchor: Some(anchor),
        }
    }

    pub fn part(&self) -> &KeyPart {
        &self.part
    }
}

/// A value usable as one memoized argument.
pub trait MemoKey {
    fn memo_key(&self) -> Key;
}

impl<T: Send + Sync + 'static> MemoKey for Arc<T> {
    fn memo_key(&self) -> Key {
        Key::identity(self)
    }
}

impl MemoKey for str {
    fn memo_key(&self) -> Key {
        Key::value(KeyPart::Str(self.into()))
    }
}

impl MemoKey for String {
    fn memo_key(&self) -> Key {
        self.as_str().memo_key()
    }
}

impl<K: MemoKey + ?Sized> MemoKey for &K {
    fn memo_key(&self) -> Key {
        (**self).memo_key()
    }
}

macro_rules! int_memo_key {
    ($($ty:ty),+) => {
        $(
            impl MemoKey for $ty {
                fn memo_key(&self) -> Key {
                    Key::value(KeyPart::Int(*self as i128))
                }
            }
        )+
    };
}

int_memo_key!(i32, i64, u32, u64, usize);

impl MemoKey for bool {
    fn memo_key(&self) -> Key {
        Key::value(KeyPart::Bool(*self))
    }
}

/// An argument tuple. Implemented for tuples of one to four [`MemoKey`]s.
pub trait MemoArgs {
    fn memo_keys(&self) -> Vec<Key>;
}

macro_rules! tuple_memo_args {
    ($($name:ident)+) => {
        impl<$($name: MemoKey),+> MemoArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn memo_keys(&self) -> Vec<Key> {
                let ($($name,)+) = self;
                vec![$($name.memo_key()),+]
            }
        }
    };
}

tuple_memo_args!(A);
tuple_memo_args!(A B);
tuple_memo_args!(A B C);
tuple_memo_args!(A B C D);

// ── Trie ─────────────────────────────────────────────────────────

struct Node<R> {
    anchor: Option<Anchor>,
    children: HashMap<KeyPart, Node<R>>,
    value: Option<R>,
}

impl<R> Node<R> {
    fn new(anchor: Option<Anchor>) -> Self {
        Self {
            anchor,
            children: HashMap::new(),
            value: None,
        }
    }

    fn is_live(&self) -> bool {
        self.anchor
            .as_ref()
            .map_or(true, |anchor| anchor.strong_count() > 0)
    }

    fn find(&self, keys: &[Key]) -> Option<&Node<R>> {
        let mut node = self;
        for key in keys {
            node = node.children.get(&key.part)?;
        }
        Some(node)
    }

    fn descend(&mut self, keys: Vec<Key>) -> &mut Node<R> {
        let mut node = self;
        for key in keys {
            node = node
                .children
                .entry(key.part)
                .or_insert_with(|| Node::new(key.anchor));
        }
        node
    }

    fn count(&self) -> usize {
        usize::from(self.value.is_some())
            + self.children.values().map(Node::count).sum::<usize>()
    }

    /// Drops dead branches and empty leaves. Returns the number of cached values dropped.
    fn prune(&mut self) -> usize {
        let mut dropped = 0;
        self.children.retain(|_, child| {
            if !child.is_live() {
                dropped += child.count();
                return false;
            }
            dropped += child.prune();
            child.value.is_some() || !child.children.is_empty()
        });
        dropped
    }
}

// ── Memo ─────────────────────────────────────────────────────────

/// Cache of results keyed by argument tuples of type `A`.
///
/// Entries are never evicted implicitly. [`Memo::prune`] releases entries
/// whose identity-keyed arguments have all been dropped by their owners.
pub struct Memo<A, R> {
    root: Mutex<Node<R>>,
    hits: AtomicU64,
    misses: AtomicU64,
    _args: PhantomData<fn(&A)>,
}

impl<A: MemoArgs, R: Clone> Memo<A, R> {
    pub fn new() -> Self {
        Self {
            root: Mutex::new(Node::new(None)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            _args: PhantomData,
        }
    }

    /// Returns the cached value for `args`, building it on first use.
    ///
    /// The lock is not held while `build` runs, so builders may consult other
    /// memos (or this one, for other tuples). A failed build stores nothing.
    pub fn get_or_try_init<E>(
        &self,
        args: &A,
        build: impl FnOnce() -> Result<R, E>,
    ) -> Result<R, E> {
        let keys = args.memo_keys();
        let cached = {
            let root = self.root.lock();
            root.find(&keys).and_then(|node| node.value.clone())
        };
        if let Some(value) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        trace!(arity = keys.len(), "memo miss");
        let value = build()?;

        let mut root = self.root.lock();
        let node = root.descend(keys);
        // A re-entrant build of the same tuple may have landed first; keep it.
        Ok(node.value.get_or_insert(value).clone())
    }

    pub fn get_or_init(&self, args: &A, build: impl FnOnce() -> R) -> R {
        match self.get_or_try_init::<Infallible>(args, || Ok(build())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Cached value for `args`, without building.
    pub fn peek(&self, args: &A) -> Option<R> {
        let keys = args.memo_keys();
        let root = self.root.lock();
        root.find(&keys).and_then(|node| node.value.clone())
    }

    pub fn len(&self) -> usize {
        self.root.lock().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        *self.root.lock() = Node::new(None);
    }

    /// Releases every entry keyed on an object that no longer has owners.
    pub fn prune(&self) -> usize {
        let dropped = self.root.lock().prune();
        if dropped > 0 {
            debug!(dropped, "pruned memo entries");
        }
        dropped
    }

    /// Drops every entry whose first argument fails `keep`.
    ///
    /// Needed when cached values own their first argument (a view owns its
    /// snapshot), since such keys never die on their own.
    pub fn retain_leading(&self, mut keep: impl FnMut(&KeyPart) -> bool) -> usize {
        let mut dropped = 0;
        self.root.lock().children.retain(|part, child| {
            if keep(part) {
                return true;
            }
            dropped += child.count();
            false
        });
        dropped
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl<A: MemoArgs, R: Clone> Default for Memo<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

// ── Memoized functions ───────────────────────────────────────────

/// A function paired with its own [`Memo`].
pub struct Memoized<A, R, F> {
    memo: Memo<A, R>,
    builder: F,
}

/// Wraps a pure function so equal-identity argument tuples share one result.
pub fn memoize<A, R, F>(builder: F) -> Memoized<A, R, F>
where
    A: MemoArgs,
    R: Clone,
    F: Fn(&A) -> R,
{
    Memoized {
        memo: Memo::new(),
        builder,
    }
}

/// Like [`memoize`], for builders that can fail. Failures are not cached.
pub fn try_memoize<A, R, E, F>(builder: F) -> Memoized<A, R, F>
where
    A: MemoArgs,
    R: Clone,
    F: Fn(&A) -> Result<R, E>,
{
    Memoized {
        memo: Memo::new(),
        builder,
    }
}

impl<A: MemoArgs, R: Clone, F> Memoized<A, R, F> {
    pub fn memo(&self) -> &Memo<A, R> {
        &self.memo
    }
}

impl<A, R, F> Memoized<A, R, F>
where
    A: MemoArgs,
    R: Clone,
    F: Fn(&A) -> R,
{
    pub fn call(&self, args: A) -> R {
        self.memo.get_or_init(&args, || (self.builder)(&args))
    }
}

impl<A, R, E, F> Memoized<A, R, F>
where
    A: MemoArgs,
    R: Clone,
    F: Fn(&A) -> Result<R, E>,
{
    pub fn try_call(&self, args: A) -> Result<R, E> {
        self.memo.get_or_try_init(&args, || (self.builder)(&args))
    }
}
