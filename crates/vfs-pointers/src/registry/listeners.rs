use std::sync::Arc;

use fnv::FnvHashMap;

use crate::pointer::{ListenerId, PointerListener};

/// Per-pointer listeners by id, plus subscribers that hear about every
/// pointer. Both share one id space.
#[derive(Default)]
pub(crate) struct Listeners {
    by_id: FnvHashMap<ListenerId, Arc<dyn PointerListener>>,
    global: Vec<(ListenerId, Arc<dyn PointerListener>)>,
    next_id: u64,
}

impl Listeners {
    fn next_id(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId::new(self.next_id)
    }

    pub fn register(&mut self, listener: Arc<dyn PointerListener>) -> ListenerId {
        let id = self.next_id();
        self.by_id.insert(id, listener);
        id
    }

    pub fn unregister(&mut self, id: ListenerId) -> bool {
        self.by_id.remove(&id).is_some()
    }

    pub fn subscribe(&mut self, listener: Arc<dyn PointerListener>) -> ListenerId {
        let id = self.next_id();
        self.global.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.global.len();
        self.global.retain(|(subscribed, _)| *subscribed != id);
        self.global.len() != before
    }

    pub fn get(&self, id: ListenerId) -> Option<&Arc<dyn PointerListener>> {
        self.by_id.get(&id)
    }

    pub fn global(&self) -> impl Iterator<Item = &Arc<dyn PointerListener>> {
        self.global.iter().map(|(_, listener)| listener)
    }

    pub fn len(&self) -> usize {
        self.by_id.len() + self.global.len()
    }
}
