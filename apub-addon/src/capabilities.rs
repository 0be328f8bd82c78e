//! The set of host capabilities the add-on runs against.

use std::sync::Arc;

use apub_host::{
    ActorResolver, Clock, ContentRenderer, ContentStore, DeliveryClient, FederationHost, LocalScheduler,
    MemoryContentStore, MemoryTransientStore, ModeratorNotifier, NoActorResolver, NoDelivery, NoFetcher, NoNotifier,
    NoReplyResolver, PlainRenderer, RemoteFetcher, ReplyResolver, SystemClock, TaskScheduler, TransientStore,
};

/// Every capability the add-on consumes. Only the federation host itself is
/// required; everything else starts out as an in-memory or no-op stand-in.
#[derive(Clone)]
pub struct HostCapabilities {
    pub host: Arc<dyn FederationHost>,
    pub store: Arc<dyn ContentStore>,
    pub transient: Arc<dyn TransientStore>,
    pub scheduler: Arc<dyn TaskScheduler>,
    /// Set while `scheduler` is the in-process one, so due tasks can be run
    pub local_scheduler: Option<Arc<LocalScheduler>>,
    pub delivery: Arc<dyn DeliveryClient>,
    pub actors: Arc<dyn ActorResolver>,
    pub fetcher: Arc<dyn RemoteFetcher>,
    pub renderer: Arc<dyn ContentRenderer>,
    pub resolver: Arc<dyn ReplyResolver>,
    pub notifier: Arc<dyn ModeratorNotifier>,
    pub clock: Arc<dyn Clock>,
    /// `transient` is still the built-in store and follows `with_clock`
    default_transient: bool,
}

impl HostCapabilities {
    pub fn new(host: Arc<dyn FederationHost>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let local = Arc::new(LocalScheduler::new());

        Self {
            host,
            store: Arc::new(MemoryContentStore::new()),
            transient: Arc::new(MemoryTransientStore::with_clock(clock.clone())),
            scheduler: local.clone(),
            local_scheduler: Some(local),
            delivery: Arc::new(NoDelivery),
            actors: Arc::new(NoActorResolver),
            fetcher: Arc::new(NoFetcher),
            renderer: Arc::new(PlainRenderer),
            resolver: Arc::new(NoReplyResolver),
            notifier: Arc::new(NoNotifier),
            clock,
            default_transient: true,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ContentStore>) -> Self {
        self.store = store;
        self
    }

    /// The transient store should expire entries on the same clock.
    pub fn with_transient(mut self, transient: Arc<dyn TransientStore>) -> Self {
        self.transient = transient;
        self.default_transient = false;
        self
    }

    /// Use the host's scheduler. Due tasks are then run by the host.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn TaskScheduler>) -> Self {
        self.scheduler = scheduler;
        self.local_scheduler = None;
        self
    }

    pub fn with_local_scheduler(mut self, scheduler: Arc<LocalScheduler>) -> Self {
        self.scheduler = scheduler.clone();
        self.local_scheduler = Some(scheduler);
        self
    }

    pub fn with_delivery(mut self, delivery: Arc<dyn DeliveryClient>) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn with_actors(mut self, actors: Arc<dyn ActorResolver>) -> Self {
        self.actors = actors;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ContentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn ReplyResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ModeratorNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Also rebuilds the built-in transient store on `clock`; a store passed
    /// to `with_transient` is left alone.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        if self.default_transient {
            self.transient = Arc::new(MemoryTransientStore::with_clock(clock.clone()));
        }
        self.clock = clock;
        self
    }
}
