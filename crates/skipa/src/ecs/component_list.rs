//! # ComponentList: Deferred Attach/Detach for One Entity
//!
//! Every entity owns a [`ComponentList`]. Attaching or detaching never touches
//! the active list directly; requests are queued and committed by
//! [`flush`](ComponentList::flush), which the entity runs at the start of its
//! per-frame update. This is what makes it safe for a component to attach or
//! detach things from inside its own hooks: the list being walked is never the
//! list being changed.
//!
//! ## Layout
//!
//! ```text
//! ComponentList
//! ├── components  active slots, attach order       ← bits reflect exactly these
//! ├── to_add      pending-add slots (own the boxes)
//! ├── to_remove   ids of active slots queued for removal
//! └── scratch     ids activated by the current flush, awaiting hooks
//! ```
//!
//! ## Flush Order
//!
//! ```text
//! flush()
//!   1. take to_remove and to_add       (new requests now land in fresh queues)
//!   2. for each removal, in order:
//!        clear bit → renderables.remove → membership notified → on_removed_from_entity
//!   3. for each addition, in order:
//!        set bit → renderables.add → membership notified → push to active
//!   4. for each addition, in order:
//!        on_added_to_entity → on_enabled (if enabled)
//! ```
//!
//! Removals settle before additions, so "detach A, attach B" in one frame
//! always ends with only B. All registrations in a batch happen before any
//! `on_added_to_entity`, so no hook sees a half-registered sibling.
//!
//! ## Lending
//!
//! A hook needs `&mut` to its component *and* access to the list (to attach,
//! detach or look up siblings). The list therefore lends the component out:
//! the box is taken from its slot, the hook runs with a [`ComponentContext`]
//! over the list, and the box goes back. While lent, a component is invisible
//! to lookups, including its own.
//!
//! ## Leaving and Rejoining a Scene
//!
//! [`deregister_all`](ComponentList::deregister_all) and
//! [`register_all`](ComponentList::register_all) withdraw and restore every
//! active component's scene registrations (renderables, signature bits,
//! system membership) without running a single hook. Components moved to
//! another scene keep their state and never see a remove/add cycle.

use std::any::TypeId;
use std::mem;
use std::sync::Arc;

use super::bits::ComponentBits;
use super::component::{Component, ComponentId, TransformChange};
use super::entity::EntityId;
use super::kind::{ComponentKind, TypeIndexRegistry};
use super::system::MembershipObserver;
use crate::render::RenderableRegistry;
use crate::time::Time;

/// The scene-side collaborators a flush reports to.
pub struct SceneLinks<'a> {
    pub renderables: &'a mut dyn RenderableRegistry,
    pub membership: &'a mut dyn MembershipObserver,
}

struct ComponentSlot {
    id: ComponentId,
    kind: ComponentKind,
    /// Concrete type, kept so the kind can be looked up again in another
    /// registry.
    type_id: TypeId,
    type_name: &'static str,
    enabled: bool,
    /// `None` while lent out to one of its own hooks.
    component: Option<Box<dyn Component>>,
}

impl ComponentSlot {
    fn get(&self) -> Option<&dyn Component> {
        self.component.as_deref()
    }

    fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.get()?.as_any().downcast_ref::<T>()
    }

    fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.component.as_deref_mut()?.as_any_mut().downcast_mut::<T>()
    }
}

#[derive(Clone, Copy)]
enum Location {
    Active(usize),
    Pending(usize),
}

/// The components attached to one entity.
pub struct ComponentList {
    owner: EntityId,
    kinds: Arc<TypeIndexRegistry>,
    next_id: u32,
    /// Enabled flag of the owning entity.
    container_enabled: bool,
    bits: ComponentBits,
    components: Vec<ComponentSlot>,
    to_add: Vec<ComponentSlot>,
    to_remove: Vec<ComponentId>,
    scratch: Vec<ComponentId>,
}

impl ComponentList {
    pub fn new(owner: EntityId, kinds: Arc<TypeIndexRegistry>) -> Self {
        Self {
            owner,
            kinds,
            next_id: 0,
            container_enabled: true,
            bits: ComponentBits::new(),
            components: Vec::new(),
            to_add: Vec::new(),
            to_remove: Vec::new(),
            scratch: Vec::new(),
        }
    }

    pub fn owner(&self) -> EntityId {
        self.owner
    }

    /// Kinds of the active components. Pending components are not included.
    pub fn signature(&self) -> &ComponentBits {
        &self.bits
    }

    /// Number of active components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Number of components waiting for the next flush to become active.
    pub fn pending_len(&self) -> usize {
        self.to_add.len()
    }

    /// Active component ids in attach order.
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.iter().map(|s| s.id)
    }

    // ── Attach / Detach ──────────────────────────────────────────────

    /// Queue `component` for the next flush.
    pub fn attach<T: Component>(&mut self, component: T) -> ComponentId {
        let id = ComponentId(self.next_id);
        self.next_id += 1;
        let kind = self.kinds.index_for::<T>();
        self.to_add.push(ComponentSlot {
            id,
            kind,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            enabled: true,
            component: Some(Box::new(component)),
        });
        log::trace!("{}: queued {:?} ({:?})", self.owner, id, kind);
        id
    }

    /// Request removal of a component.
    ///
    /// A component still waiting to be added is dropped on the spot and never
    /// sees a hook. An active one is queued and leaves on the next flush.
    /// Returns `false` (and logs a warning) if the component is already queued
    /// for removal or unknown.
    pub fn detach(&mut self, id: ComponentId) -> bool {
        if self.to_remove.contains(&id) {
            log::warn!(
                "{}: {:?} is already queued for removal; ignoring duplicate detach",
                self.owner,
                id
            );
            return false;
        }
        if let Some(index) = self.to_add.iter().position(|s| s.id == id) {
            self.to_add.remove(index);
            return true;
        }
        if self.components.iter().any(|s| s.id == id) {
            self.to_remove.push(id);
            return true;
        }
        log::warn!("{}: detach of unknown {:?}", self.owner, id);
        false
    }

    /// `true` if an active component is waiting to be removed on the next flush.
    pub fn is_pending_removal(&self, id: ComponentId) -> bool {
        self.to_remove.contains(&id)
    }

    // ── Flush ────────────────────────────────────────────────────────

    /// Commit queued removals, then queued additions.
    pub fn flush(&mut self, links: &mut SceneLinks<'_>) {
        if self.to_remove.is_empty() && self.to_add.is_empty() {
            return;
        }
        let removals = mem::take(&mut self.to_remove);
        let additions = mem::take(&mut self.to_add);

        for id in removals {
            match self.components.iter().position(|s| s.id == id) {
                Some(index) => {
                    let slot = self.components.remove(index);
                    self.handle_remove(slot, links);
                }
                None => log::debug!("{}: {:?} was already gone at flush", self.owner, id),
            }
        }

        if additions.is_empty() {
            return;
        }

        let mut batch = mem::take(&mut self.scratch);
        for slot in additions {
            register(self.owner, &mut self.bits, &slot, links);
            batch.push(slot.id);
            self.components.push(slot);
        }

        // Everything in the batch is registered; now the hooks.
        for &id in &batch {
            let container_enabled = self.container_enabled;
            self.lend(id, |component, ctx| {
                component.on_added_to_entity(ctx);
                if container_enabled && ctx.is_enabled() {
                    component.on_enabled(ctx);
                }
            });
        }
        batch.clear();
        self.scratch = batch;
    }

    /// Remove every active component right now, skipping the queues, then
    /// drop anything still pending. Used when the owning entity is destroyed.
    pub fn remove_all(&mut self, links: &mut SceneLinks<'_>) {
        while !self.components.is_empty() {
            let slot = self.components.remove(0);
            self.handle_remove(slot, links);
        }
        self.to_add.clear();
        self.to_remove.clear();
        self.scratch.clear();
    }

    fn handle_remove(&mut self, mut slot: ComponentSlot, links: &mut SceneLinks<'_>) {
        // Idempotent. The capability may have changed since registration.
        links.renderables.remove(self.owner, slot.id);
        if !self.components.iter().any(|s| s.kind == slot.kind) {
            self.bits.clear(slot.kind);
        }
        links.membership.signature_changed(self.owner, &self.bits);

        if let Some(mut component) = slot.component.take() {
            let mut ctx = ComponentContext {
                list: self,
                component: slot.id,
            };
            component.on_removed_from_entity(&mut ctx);
        }
        log::trace!("{}: removed {:?}", self.owner, slot.id);
    }

    // ── Scene membership ─────────────────────────────────────────────

    /// Withdraw every active component from the scene: renderables dropped,
    /// bits cleared, systems told. No hooks run and nothing is queued or
    /// dropped, so [`register_all`](Self::register_all) restores the lot.
    pub fn deregister_all(&mut self, links: &mut SceneLinks<'_>) {
        for slot in &self.components {
            links.renderables.remove(self.owner, slot.id);
            self.bits.clear(slot.kind);
            links.membership.signature_changed(self.owner, &self.bits);
        }
        log::trace!("{}: deregistered {} components", self.owner, self.components.len());
    }

    /// Register every active component with the scene again, without hooks.
    pub fn register_all(&mut self, links: &mut SceneLinks<'_>) {
        for slot in &self.components {
            register(self.owner, &mut self.bits, slot, links);
        }
        log::trace!("{}: registered {} components", self.owner, self.components.len());
    }

    /// Give the list a new owner and kind registry. Only valid while
    /// deregistered; every kind is looked up again in `kinds`.
    pub(crate) fn rebind(&mut self, owner: EntityId, kinds: Arc<TypeIndexRegistry>) {
        self.owner = owner;
        if !Arc::ptr_eq(&self.kinds, &kinds) {
            for slot in self.components.iter_mut().chain(self.to_add.iter_mut()) {
                slot.kind = kinds.index_for_type(slot.type_id, slot.type_name);
            }
            self.kinds = kinds;
        }
        self.bits = ComponentBits::new();
    }

    // ── Per-frame ────────────────────────────────────────────────────

    /// Flush, then run `update` on every enabled component whose interval
    /// divides the current frame count. Nothing updates while the owning
    /// entity is disabled.
    pub fn update(&mut self, links: &mut SceneLinks<'_>, time: &Time) {
        self.flush(links);
        if !self.container_enabled {
            return;
        }

        let frame = time.frame_count();
        // Hooks cannot add or remove active slots, so the length is stable.
        for index in 0..self.components.len() {
            let slot = &self.components[index];
            if !slot.enabled {
                continue;
            }
            let Some(component) = slot.get() else {
                continue;
            };
            let interval = u64::from(component.update_interval().max(1));
            if frame % interval != 0 {
                continue;
            }
            let id = slot.id;
            self.lend(id, |component, ctx| component.update(ctx, time));
        }
    }

    /// Forward a transform change to every enabled active and pending
    /// component. Nothing hears it while the owning entity is disabled.
    pub fn on_entity_transform_changed(&mut self, change: TransformChange) {
        if !self.container_enabled {
            return;
        }
        let targets: Vec<ComponentId> = self
            .components
            .iter()
            .chain(&self.to_add)
            .filter(|s| s.enabled)
            .map(|s| s.id)
            .collect();
        for id in targets {
            self.lend(id, |component, ctx| {
                component.on_entity_transform_changed(ctx, change)
            });
        }
    }

    // ── Enabled state ────────────────────────────────────────────────

    pub fn is_enabled(&self, id: ComponentId) -> bool {
        self.locate(id).is_some_and(|at| self.slot(at).enabled)
    }

    /// Enable or disable one component. Active components get
    /// `on_enabled`/`on_disabled` while the owning entity is enabled; pending
    /// ones just take the new flag into their activation.
    pub fn set_enabled(&mut self, id: ComponentId, enabled: bool) -> bool {
        let Some(at) = self.locate(id) else {
            log::warn!("{}: set_enabled on unknown {:?}", self.owner, id);
            return false;
        };
        let slot = self.slot_mut(at);
        if slot.enabled == enabled {
            return true;
        }
        slot.enabled = enabled;
        if matches!(at, Location::Active(_)) && self.container_enabled {
            self.lend(id, |component, ctx| toggle(component, ctx, enabled));
        }
        true
    }

    /// Propagate the owning entity's enabled flag.
    pub fn set_container_enabled(&mut self, enabled: bool) {
        if self.container_enabled == enabled {
            return;
        }
        self.container_enabled = enabled;
        let targets: Vec<ComponentId> = self
            .components
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.id)
            .collect();
        for id in targets {
            self.lend(id, |component, ctx| toggle(component, ctx, enabled));
        }
    }

    // ── Lookup ───────────────────────────────────────────────────────

    /// First component of type `T`, in attach order. With `include_pending`,
    /// components waiting to be added are searched after the active ones.
    pub fn find<T: Component>(&self, include_pending: bool) -> Option<&T> {
        let kind = self.kind_of::<T>(log::Level::Warn)?;
        self.find_kind(kind, include_pending)
    }

    fn find_kind<T: Component>(&self, kind: ComponentKind, include_pending: bool) -> Option<&T> {
        let pending: &[ComponentSlot] = if include_pending { &self.to_add } else { &[] };
        self.components
            .iter()
            .chain(pending)
            .filter(|s| s.kind == kind)
            .find_map(|s| s.downcast_ref::<T>())
    }

    pub fn find_mut<T: Component>(&mut self, include_pending: bool) -> Option<&mut T> {
        let kind = self.kind_of::<T>(log::Level::Warn)?;
        let pending: &mut [ComponentSlot] = if include_pending {
            &mut self.to_add
        } else {
            &mut []
        };
        self.components
            .iter_mut()
            .chain(pending.iter_mut())
            .filter(|s| s.kind == kind)
            .find_map(|s| s.downcast_mut::<T>())
    }

    /// Every component of type `T`: active first, then pending if asked.
    pub fn find_all<T: Component>(&self, include_pending: bool) -> Vec<&T> {
        let Some(kind) = self.kind_of::<T>(log::Level::Warn) else {
            return Vec::new();
        };
        let pending: &[ComponentSlot] = if include_pending { &self.to_add } else { &[] };
        self.components
            .iter()
            .chain(pending)
            .filter(|s| s.kind == kind)
            .filter_map(|s| s.downcast_ref::<T>())
            .collect()
    }

    /// `true` if an active component of type `T` is attached. Asking about
    /// a type that was never attached is an ordinary question, not misuse.
    pub fn has<T: Component>(&self) -> bool {
        self.kind_of::<T>(log::Level::Debug)
            .is_some_and(|kind| self.find_kind::<T>(kind, false).is_some())
    }

    /// Component by handle, active or pending.
    pub fn get<T: Component>(&self, id: ComponentId) -> Option<&T> {
        self.locate(id).and_then(|at| self.slot(at).downcast_ref::<T>())
    }

    pub fn get_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut T> {
        let at = self.locate(id)?;
        self.slot_mut(at).downcast_mut::<T>()
    }

    fn kind_of<T: 'static>(&self, level: log::Level) -> Option<ComponentKind> {
        let kind = self.kinds.lookup::<T>();
        if kind.is_none() {
            log::log!(
                level,
                "{}: lookup of `{}`, which has never been attached anywhere",
                self.owner,
                std::any::type_name::<T>()
            );
        }
        kind
    }

    fn locate(&self, id: ComponentId) -> Option<Location> {
        if let Some(index) = self.components.iter().position(|s| s.id == id) {
            return Some(Location::Active(index));
        }
        self.to_add
            .iter()
            .position(|s| s.id == id)
            .map(Location::Pending)
    }

    fn slot(&self, at: Location) -> &ComponentSlot {
        match at {
            Location::Active(i) => &self.components[i],
            Location::Pending(i) => &self.to_add[i],
        }
    }

    fn slot_mut(&mut self, at: Location) -> &mut ComponentSlot {
        match at {
            Location::Active(i) => &mut self.components[i],
            Location::Pending(i) => &mut self.to_add[i],
        }
    }

    /// Take component `id` out of its slot, run `f`, and put it back.
    /// Returns `None` if the component is unknown or already lent out.
    fn lend<R>(
        &mut self,
        id: ComponentId,
        f: impl FnOnce(&mut dyn Component, &mut ComponentContext<'_>) -> R,
    ) -> Option<R> {
        let at = self.locate(id)?;
        let mut component = self.slot_mut(at).component.take()?;
        let result = {
            let mut ctx = ComponentContext {
                list: self,
                component: id,
            };
            f(&mut *component, &mut ctx)
        };
        // A pending component can be cancelled by its own hook.
        if let Some(at) = self.locate(id) {
            self.slot_mut(at).component = Some(component);
        }
        Some(result)
    }
}

fn register(
    owner: EntityId,
    bits: &mut ComponentBits,
    slot: &ComponentSlot,
    links: &mut SceneLinks<'_>,
) {
    if let Some(renderable) = slot.get().and_then(|c| c.as_renderable()) {
        links.renderables.add(owner, slot.id, renderable);
    }
    bits.set(slot.kind);
    links.membership.signature_changed(owner, bits);
}

fn toggle(component: &mut dyn Component, ctx: &mut ComponentContext<'_>, enabled: bool) {
    if enabled {
        component.on_enabled(ctx);
    } else {
        component.on_disabled(ctx);
    }
}

/// What a component hook can reach: its owning entity's component list.
///
/// Attach and detach are queued exactly as they are from outside, so nothing
/// done here takes effect before the next flush.
pub struct ComponentContext<'a> {
    list: &'a mut ComponentList,
    component: ComponentId,
}

impl ComponentContext<'_> {
    /// The entity that owns the component receiving this hook.
    pub fn entity(&self) -> EntityId {
        self.list.owner
    }

    /// The component receiving this hook.
    pub fn component(&self) -> ComponentId {
        self.component
    }

    pub fn attach<T: Component>(&mut self, component: T) -> ComponentId {
        self.list.attach(component)
    }

    pub fn detach(&mut self, id: ComponentId) -> bool {
        self.list.detach(id)
    }

    /// Detach the component receiving this hook.
    pub fn detach_self(&mut self) -> bool {
        self.list.detach(self.component)
    }

    pub fn find<T: Component>(&self, include_pending: bool) -> Option<&T> {
        self.list.find::<T>(include_pending)
    }

    pub fn find_mut<T: Component>(&mut self, include_pending: bool) -> Option<&mut T> {
        self.list.find_mut::<T>(include_pending)
    }

    pub fn find_all<T: Component>(&self, include_pending: bool) -> Vec<&T> {
        self.list.find_all::<T>(include_pending)
    }

    pub fn has<T: Component>(&self) -> bool {
        self.list.has::<T>()
    }

    pub fn signature(&self) -> &ComponentBits {
        &self.list.bits
    }

    fn is_enabled(&self) -> bool {
        self.list.is_enabled(self.component)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::render::{Renderable, RenderableList};

    type Log = Rc<RefCell<Vec<String>>>;

    fn push(log: &Log, entry: impl Into<String>) {
        log.borrow_mut().push(entry.into());
    }

    /// Records every hook into a shared log.
    macro_rules! recording {
        ($name:ident) => {
            struct $name(Log);

            impl Component for $name {
                fn on_added_to_entity(&mut self, _ctx: &mut ComponentContext<'_>) {
                    push(&self.0, concat!(stringify!($name), ":added"));
                }
                fn on_enabled(&mut self, _ctx: &mut ComponentContext<'_>) {
                    push(&self.0, concat!(stringify!($name), ":enabled"));
                }
                fn on_disabled(&mut self, _ctx: &mut ComponentContext<'_>) {
                    push(&self.0, concat!(stringify!($name), ":disabled"));
                }
                fn on_entity_transform_changed(
                    &mut self,
                    _ctx: &mut ComponentContext<'_>,
                    _change: TransformChange,
                ) {
                    push(&self.0, concat!(stringify!($name), ":transform"));
                }
                fn update(&mut self, _ctx: &mut ComponentContext<'_>, _time: &Time) {
                    push(&self.0, concat!(stringify!($name), ":update"));
                }
                fn on_removed_from_entity(&mut self, _ctx: &mut ComponentContext<'_>) {
                    push(&self.0, concat!(stringify!($name), ":removed"));
                }
            }
        };
    }

    recording!(A);
    recording!(B);

    /// Remembers every signature it was told about.
    #[derive(Default)]
    struct Recorder {
        changes: Vec<(EntityId, ComponentBits)>,
    }

    impl MembershipObserver for Recorder {
        fn signature_changed(&mut self, entity: EntityId, signature: &ComponentBits) {
            self.changes.push((entity, signature.clone()));
        }

        fn entity_removed(&mut self, _entity: EntityId) {}
    }

    struct Harness {
        kinds: Arc<TypeIndexRegistry>,
        list: ComponentList,
        renderables: RenderableList,
        recorder: Recorder,
        time: Time,
    }

    impl Harness {
        fn new() -> Self {
            let kinds = Arc::new(TypeIndexRegistry::new());
            let owner = EntityId {
                index: 0,
                generation: 0,
            };
            Self {
                list: ComponentList::new(owner, kinds.clone()),
                kinds,
                renderables: RenderableList::new(),
                recorder: Recorder::default(),
                time: Time::new(),
            }
        }

        fn flush(&mut self) {
            let mut links = SceneLinks {
                renderables: &mut self.renderables,
                membership: &mut self.recorder,
            };
            self.list.flush(&mut links);
        }

        fn frame(&mut self) {
            self.time.advance(Duration::from_millis(16));
            let mut links = SceneLinks {
                renderables: &mut self.renderables,
                membership: &mut self.recorder,
            };
            self.list.update(&mut links, &self.time);
        }

        fn remove_all(&mut self) {
            let mut links = SceneLinks {
                renderables: &mut self.renderables,
                membership: &mut self.recorder,
            };
            self.list.remove_all(&mut links);
        }

        fn deregister_all(&mut self) {
            let mut links = SceneLinks {
                renderables: &mut self.renderables,
                membership: &mut self.recorder,
            };
            self.list.deregister_all(&mut links);
        }

        fn register_all(&mut self) {
            let mut links = SceneLinks {
                renderables: &mut self.renderables,
                membership: &mut self.recorder,
            };
            self.list.register_all(&mut links);
        }

        fn kinds(&self) -> Vec<usize> {
            self.list.signature().iter().map(|k| k.index()).collect()
        }
    }

    fn new_log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    #[test]
    fn remove_settles_before_add() {
        let mut h = Harness::new();
        let log = new_log();
        // Fix A = 0 and B = 1.
        h.kinds.index_for::<A>();
        h.kinds.index_for::<B>();

        let a = h.list.attach(A(log.clone()));
        h.flush();
        assert_eq!(h.kinds(), vec![0]);
        assert!(h.list.find::<A>(false).is_some());
        assert!(h.list.find::<B>(false).is_none());

        h.list.attach(B(log.clone()));
        h.list.detach(a);
        h.flush();
        assert_eq!(h.kinds(), vec![1]);
        assert!(h.list.find::<A>(false).is_none());
        assert!(h.list.find::<B>(false).is_some());
    }

    #[test]
    fn pending_components_do_not_touch_the_signature() {
        let mut h = Harness::new();
        let log = new_log();
        h.list.attach(A(log.clone()));

        assert!(h.list.signature().is_empty());
        assert!(h.list.find::<A>(false).is_none());
        assert!(h.list.find::<A>(true).is_some());
        assert_eq!(h.list.pending_len(), 1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn added_then_enabled_in_attach_order() {
        let mut h = Harness::new();
        let log = new_log();
        h.list.attach(A(log.clone()));
        h.list.attach(B(log.clone()));
        h.flush();

        assert_eq!(
            *log.borrow(),
            vec!["A:added", "A:enabled", "B:added", "B:enabled"]
        );
        let order: Vec<u32> = h.list.ids().map(|id| id.raw()).collect();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn detach_while_pending_cancels_silently() {
        let mut h = Harness::new();
        let log = new_log();
        let a = h.list.attach(A(log.clone()));
        assert!(h.list.detach(a));
        h.flush();

        assert!(h.list.is_empty());
        assert!(h.list.signature().is_empty());
        assert!(log.borrow().is_empty());
        assert!(h.recorder.changes.is_empty());
    }

    #[test]
    fn cancel_and_reattach_in_one_frame() {
        let mut h = Harness::new();
        let first = new_log();
        let second = new_log();

        let c = h.list.attach(A(first.clone()));
        h.list.detach(c);
        let c2 = h.list.attach(A(second.clone()));
        h.flush();

        assert_eq!(h.list.len(), 1);
        assert_eq!(h.list.ids().collect::<Vec<_>>(), vec![c2]);
        assert!(first.borrow().is_empty());
        assert_eq!(*second.borrow(), vec!["A:added", "A:enabled"]);
    }

    #[test]
    fn duplicate_detach_is_a_no_op() {
        let mut h = Harness::new();
        let log = new_log();
        let a = h.list.attach(A(log.clone()));
        h.flush();

        assert!(h.list.detach(a));
        assert!(!h.list.detach(a));
        assert!(h.list.is_pending_removal(a));
        h.flush();

        let removed = log.borrow().iter().filter(|e| *e == "A:removed").count();
        assert_eq!(removed, 1);
        assert!(h.list.is_empty());
    }

    #[test]
    fn detach_unknown_returns_false() {
        let mut h = Harness::new();
        assert!(!h.list.detach(ComponentId(42)));
    }

    #[test]
    fn queued_removal_stays_visible_until_flush() {
        let mut h = Harness::new();
        let log = new_log();
        let a = h.list.attach(A(log.clone()));
        h.flush();
        h.list.detach(a);

        // Still active, so signature and lookup agree.
        assert!(h.list.has::<A>());
        assert_eq!(h.list.signature().len(), 1);

        h.flush();
        assert!(!h.list.has::<A>());
        assert!(h.list.signature().is_empty());
        assert_eq!(*log.borrow(), vec!["A:added", "A:enabled", "A:removed"]);
    }

    /// Checks, from its added hook, what the rest of the batch looks like.
    struct Inspector {
        saw_sibling: Rc<RefCell<Option<bool>>>,
        saw_bits: Rc<RefCell<usize>>,
    }

    impl Component for Inspector {
        fn on_added_to_entity(&mut self, ctx: &mut ComponentContext<'_>) {
            *self.saw_sibling.borrow_mut() = Some(ctx.has::<B>());
            *self.saw_bits.borrow_mut() = ctx.signature().len();
        }
    }

    #[test]
    fn whole_batch_registered_before_first_hook() {
        let mut h = Harness::new();
        let log = new_log();
        let saw_sibling = Rc::new(RefCell::new(None));
        let saw_bits = Rc::new(RefCell::new(0));

        h.list.attach(Inspector {
            saw_sibling: saw_sibling.clone(),
            saw_bits: saw_bits.clone(),
        });
        h.list.attach(B(log.clone()));
        h.flush();

        assert_eq!(*saw_sibling.borrow(), Some(true));
        assert_eq!(*saw_bits.borrow(), 2);
        // Both registrations were reported before any hook ran.
        assert_eq!(h.recorder.changes.len(), 2);
    }

    /// Attaches a `B` when it becomes active.
    struct Spawner(Log);

    impl Component for Spawner {
        fn on_added_to_entity(&mut self, ctx: &mut ComponentContext<'_>) {
            ctx.attach(B(self.0.clone()));
        }
    }

    #[test]
    fn attach_from_hook_waits_for_next_flush() {
        let mut h = Harness::new();
        let log = new_log();
        h.list.attach(Spawner(log.clone()));
        h.flush();

        assert_eq!(h.list.len(), 1);
        assert_eq!(h.list.pending_len(), 1);
        assert!(!h.list.has::<B>());
        assert!(log.borrow().is_empty());

        h.flush();
        assert!(h.list.has::<B>());
        assert_eq!(h.list.pending_len(), 0);
        assert_eq!(*log.borrow(), vec!["B:added", "B:enabled"]);
    }

    /// Removes itself as soon as it is added.
    struct OneShot(Log);

    impl Component for OneShot {
        fn on_added_to_entity(&mut self, ctx: &mut ComponentContext<'_>) {
            push(&self.0, "one_shot:added");
            assert!(ctx.detach_self());
        }

        fn on_removed_from_entity(&mut self, _ctx: &mut ComponentContext<'_>) {
            push(&self.0, "one_shot:removed");
        }
    }

    #[test]
    fn detach_self_from_hook_takes_one_more_flush() {
        let mut h = Harness::new();
        let log = new_log();
        let id = h.list.attach(OneShot(log.clone()));
        h.flush();

        assert_eq!(h.list.len(), 1);
        assert!(h.list.is_pending_removal(id));

        h.flush();
        assert!(h.list.is_empty());
        assert_eq!(*log.borrow(), vec!["one_shot:added", "one_shot:removed"]);
    }

    /// Attaches a replacement while being removed.
    struct Phoenix(Log);

    impl Component for Phoenix {
        fn on_removed_from_entity(&mut self, ctx: &mut ComponentContext<'_>) {
            ctx.attach(A(self.0.clone()));
        }
    }

    #[test]
    fn attach_from_removal_hook_waits_for_next_flush() {
        let mut h = Harness::new();
        let log = new_log();
        let p = h.list.attach(Phoenix(log.clone()));
        h.flush();

        h.list.detach(p);
        h.flush();
        assert!(h.list.is_empty());
        assert_eq!(h.list.pending_len(), 1);

        h.flush();
        assert!(h.list.has::<A>());
    }

    #[test]
    fn disabled_component_skips_enable_and_update() {
        let mut h = Harness::new();
        let log = new_log();
        let a = h.list.attach(A(log.clone()));
        h.list.set_enabled(a, false);
        h.frame();
        h.frame();

        assert_eq!(*log.borrow(), vec!["A:added"]);

        h.list.set_enabled(a, true);
        h.frame();
        assert_eq!(*log.borrow(), vec!["A:added", "A:enabled", "A:update"]);
    }

    #[test]
    fn disabled_container_blocks_updates_but_still_flushes() {
        let mut h = Harness::new();
        let log = new_log();
        h.list.set_container_enabled(false);
        h.list.attach(A(log.clone()));
        h.frame();

        assert!(h.list.has::<A>());
        assert_eq!(*log.borrow(), vec!["A:added"]);

        h.list.set_container_enabled(true);
        h.frame();
        assert_eq!(*log.borrow(), vec!["A:added", "A:enabled", "A:update"]);

        h.list.set_container_enabled(false);
        assert_eq!(log.borrow().last().map(String::as_str), Some("A:disabled"));
    }

    struct EveryThird(Rc<RefCell<Vec<u64>>>);

    impl Component for EveryThird {
        fn update(&mut self, _ctx: &mut ComponentContext<'_>, time: &Time) {
            self.0.borrow_mut().push(time.frame_count());
        }

        fn update_interval(&self) -> u32 {
            3
        }
    }

    #[test]
    fn update_interval_is_respected() {
        let mut h = Harness::new();
        let frames = Rc::new(RefCell::new(Vec::new()));
        h.list.attach(EveryThird(frames.clone()));
        for _ in 0..7 {
            h.frame();
        }
        assert_eq!(*frames.borrow(), vec![3, 6]);
    }

    #[test]
    fn remove_all_is_immediate() {
        let mut h = Harness::new();
        let log = new_log();
        h.list.attach(A(log.clone()));
        h.flush();
        h.list.attach(B(log.clone()));

        h.remove_all();

        assert!(h.list.is_empty());
        assert_eq!(h.list.pending_len(), 0);
        assert!(h.list.signature().is_empty());
        assert_eq!(*log.borrow(), vec!["A:added", "A:enabled", "A:removed"]);
        let (_, last) = h.recorder.changes.last().unwrap();
        assert!(last.is_empty());
    }

    struct Sprite;

    impl Renderable for Sprite {
        fn render_layer(&self) -> i32 {
            2
        }
    }

    impl Component for Sprite {
        fn as_renderable(&self) -> Option<&dyn Renderable> {
            Some(self)
        }
    }

    #[test]
    fn renderables_follow_activation() {
        let mut h = Harness::new();
        let log = new_log();
        let sprite = h.list.attach(Sprite);
        h.list.attach(A(log));
        assert!(h.renderables.is_empty());

        h.flush();
        assert_eq!(h.renderables.len(), 1);
        assert!(h.renderables.contains(h.list.owner(), sprite));
        assert_eq!(h.renderables.in_layer(2).count(), 1);

        h.list.detach(sprite);
        h.flush();
        assert!(h.renderables.is_empty());
    }

    #[test]
    fn membership_sees_each_change() {
        let mut h = Harness::new();
        let log = new_log();
        let a = h.list.attach(A(log.clone()));
        h.list.attach(B(log.clone()));
        h.flush();
        h.list.detach(a);
        h.flush();

        let sizes: Vec<usize> = h.recorder.changes.iter().map(|(_, s)| s.len()).collect();
        assert_eq!(sizes, vec![1, 2, 1]);
        assert!(h.recorder.changes.iter().all(|(e, _)| *e == h.list.owner()));
    }

    #[test]
    fn transform_changes_reach_enabled_active_and_pending() {
        let mut h = Harness::new();
        let active = new_log();
        let pending = new_log();
        let disabled = new_log();

        h.list.attach(A(active.clone()));
        let d = h.list.attach(B(disabled.clone()));
        h.flush();
        h.list.set_enabled(d, false);
        disabled.borrow_mut().clear();
        h.list.attach(A(pending.clone()));

        h.list.on_entity_transform_changed(TransformChange::Translation);

        assert_eq!(active.borrow().last().map(String::as_str), Some("A:transform"));
        assert_eq!(*pending.borrow(), vec!["A:transform"]);
        assert!(disabled.borrow().is_empty());
    }

    #[test]
    fn second_instance_keeps_the_bit() {
        let mut h = Harness::new();
        let log = new_log();
        let first = h.list.attach(A(log.clone()));
        h.list.attach(A(log.clone()));
        h.flush();
        assert_eq!(h.list.find_all::<A>(false).len(), 2);

        h.list.detach(first);
        h.flush();
        assert!(h.list.has::<A>());
        assert_eq!(h.list.signature().len(), 1);
    }

    #[test]
    fn find_all_lists_active_then_pending() {
        struct Tag(u8);
        impl Component for Tag {}

        let mut h = Harness::new();
        h.list.attach(Tag(1));
        h.flush();
        h.list.attach(Tag(2));

        let active: Vec<u8> = h.list.find_all::<Tag>(false).iter().map(|t| t.0).collect();
        let all: Vec<u8> = h.list.find_all::<Tag>(true).iter().map(|t| t.0).collect();
        assert_eq!(active, vec![1]);
        assert_eq!(all, vec![1, 2]);
    }

    #[test]
    fn find_mut_and_get_by_id() {
        struct Counter(u32);
        impl Component for Counter {}

        let mut h = Harness::new();
        let id = h.list.attach(Counter(0));
        h.list.find_mut::<Counter>(true).unwrap().0 = 5;
        assert_eq!(h.list.get::<Counter>(id).map(|c| c.0), Some(5));

        h.flush();
        h.list.get_mut::<Counter>(id).unwrap().0 += 1;
        assert_eq!(h.list.find::<Counter>(false).map(|c| c.0), Some(6));
        assert!(h.list.get::<A>(id).is_none());
    }

    #[test]
    fn lookup_of_never_attached_kind_is_none() {
        struct Ghost;
        impl Component for Ghost {}

        let h = Harness::new();
        assert!(h.list.find::<Ghost>(true).is_none());
        assert!(h.list.find_all::<Ghost>(true).is_empty());
        assert!(h.kinds.lookup::<Ghost>().is_none());
    }

    #[test]
    fn signature_agrees_with_lookup_after_mixed_operations() {
        let mut h = Harness::new();
        let log = new_log();
        let a1 = h.list.attach(A(log.clone()));
        let b1 = h.list.attach(B(log.clone()));
        h.flush();
        h.list.detach(a1);
        let a2 = h.list.attach(A(log.clone()));
        h.list.detach(a2);
        h.flush();
        h.list.detach(b1);
        h.list.attach(A(log.clone()));
        h.flush();

        let a_kind = h.kinds.lookup::<A>().unwrap();
        let b_kind = h.kinds.lookup::<B>().unwrap();
        assert_eq!(h.list.signature().contains(a_kind), h.list.has::<A>());
        assert_eq!(h.list.signature().contains(b_kind), h.list.has::<B>());
        assert!(h.list.has::<A>());
        assert!(!h.list.has::<B>());
    }

    #[test]
    fn transform_changes_are_silent_while_container_disabled() {
        let mut h = Harness::new();
        let log = new_log();
        h.list.attach(A(log.clone()));
        h.flush();
        h.list.set_container_enabled(false);
        h.list.attach(A(log.clone()));
        log.borrow_mut().clear();

        h.list.on_entity_transform_changed(TransformChange::Translation);
        assert!(log.borrow().is_empty());

        h.list.set_container_enabled(true);
        log.borrow_mut().clear();
        h.list.on_entity_transform_changed(TransformChange::Scale);
        assert_eq!(*log.borrow(), vec!["A:transform", "A:transform"]);
    }

    #[test]
    fn deregister_and_register_all_run_no_hooks() {
        let mut h = Harness::new();
        let log = new_log();
        let sprite = h.list.attach(Sprite);
        h.list.attach(A(log.clone()));
        h.flush();
        let before = h.list.signature().clone();
        log.borrow_mut().clear();

        h.deregister_all();
        assert!(h.renderables.is_empty());
        assert!(h.list.signature().is_empty());
        assert!(h.recorder.changes.last().unwrap().1.is_empty());
        // Still owned and still findable through the list itself.
        assert_eq!(h.list.len(), 2);

        h.register_all();
        assert!(h.renderables.contains(h.list.owner(), sprite));
        assert_eq!(*h.list.signature(), before);
        assert_eq!(h.recorder.changes.last().unwrap().1, before);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn rebind_looks_kinds_up_in_the_new_registry() {
        let mut h = Harness::new();
        let log = new_log();
        h.kinds.index_for::<B>();
        h.list.attach(A(log.clone()));
        h.flush();
        h.list.attach(A(log.clone()));
        assert_eq!(h.kinds(), vec![1]);

        h.deregister_all();
        let other = Arc::new(TypeIndexRegistry::new());
        let owner = EntityId {
            index: 7,
            generation: 2,
        };
        h.list.rebind(owner, other.clone());
        h.register_all();

        let a = other.lookup::<A>().unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(h.list.owner(), owner);
        assert!(h.list.signature().contains(a));
        assert_eq!(h.list.find_all::<A>(true).len(), 2);

        h.flush();
        assert_eq!(h.list.signature().len(), 1);
        assert_eq!(h.list.find_all::<A>(false).len(), 2);
    }

    /// Renderable only while its flag is up.
    struct Flicker(Rc<RefCell<bool>>);

    impl Renderable for Flicker {}

    impl Component for Flicker {
        fn as_renderable(&self) -> Option<&dyn Renderable> {
            if *self.0.borrow() {
                Some(self)
            } else {
                None
            }
        }
    }

    #[test]
    fn renderable_entry_goes_even_if_capability_was_dropped() {
        let mut h = Harness::new();
        let visible = Rc::new(RefCell::new(true));
        let id = h.list.attach(Flicker(visible.clone()));
        h.flush();
        assert_eq!(h.renderables.len(), 1);

        *visible.borrow_mut() = false;
        h.list.detach(id);
        h.flush();
        assert!(h.renderables.is_empty());
    }

    #[test]
    fn has_of_unknown_kind_is_false() {
        struct Unseen;
        impl Component for Unseen {}

        let h = Harness::new();
        assert!(!h.list.has::<Unseen>());
        assert!(h.kinds.lookup::<Unseen>().is_none());
    }
}
