//! The engine facade: save, load, destroy, registry queries, counters.
//!
//! An [`Engine`] is stateless request/response logic over two shared
//! handles: the backing store and the frozen schema. It holds no locks of
//! its own; clones are cheap and safe to use from any thread.

use std::sync::Arc;

use tracing::{debug, warn};

use lattice_schema::{keys, CascadePolicy, FieldMap, Schema};
use lattice_store::{KvStore, StoreError};
use lattice_types::{validate_identifier, WriteStamp};

use crate::cascade::{self, CascadeReport};
use crate::config::EngineConfig;
use crate::counter::BoundedCounter;
use crate::entity::Entity;
use crate::error::{EngineError, EngineResult};
use crate::instances;
use crate::propagate::{self, SaveOutcome};

/// The relationship/indexing consistency engine.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn KvStore>,
    schema: Arc<Schema>,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine over a store and a frozen schema.
    pub fn new(store: Arc<dyn KvStore>, schema: Arc<Schema>) -> Self {
        Self::with_config(store, schema, EngineConfig::default())
    }

    /// Create an engine with explicit configuration.
    pub fn with_config(store: Arc<dyn KvStore>, schema: Arc<Schema>, config: EngineConfig) -> Self {
        Self {
            store,
            schema,
            config,
        }
    }

    /// Create an engine over the process-wide installed schema.
    pub fn from_installed(store: Arc<dyn KvStore>) -> EngineResult<Self> {
        let schema = lattice_schema::installed().ok_or(EngineError::SchemaNotInstalled)?;
        Ok(Self::new(store, schema))
    }

    /// The schema this engine dispatches against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Save
    // ------------------------------------------------------------------

    /// Save an object: write its hash, refresh the instances registry, and
    /// propagate every declared relationship.
    ///
    /// Unique-index slots are claimed first; a slot held by a different
    /// identifier aborts with [`EngineError::UniqueIndexConflict`] (earlier
    /// claims stay applied -- they are idempotent and consistent). All
    /// remaining mutations are applied as one idempotent batch. Score and
    /// owner-field failures are reported per relationship in the outcome,
    /// never raised.
    pub fn save(&self, entity: &dyn Entity) -> EngineResult<SaveOutcome> {
        let class = entity.class();
        let identifier = entity.identifier();
        validate_identifier(identifier)?;

        let fields = entity.fields();
        let plan = propagate::plan_save(&self.schema, class, identifier, &fields, WriteStamp::now())?;

        for claim in &plan.unique_claims {
            let claimed = self
                .store
                .hash_set_if_absent(&claim.key, &claim.value, identifier)?;
            if claimed {
                continue;
            }
            match self.store.hash_get(&claim.key, &claim.value)?.as_deref() {
                // Re-saving the same object refreshes, never conflicts.
                Some(existing) if existing == identifier => {}
                Some(existing) => {
                    return Err(EngineError::UniqueIndexConflict {
                        class: class.to_string(),
                        index: claim.relation.clone(),
                        value: claim.value.clone(),
                        existing: existing.to_string(),
                        incoming: identifier.to_string(),
                    });
                }
                // The holder vanished between the claim and the read; claim
                // again on the now-empty slot.
                None => {
                    self.store
                        .hash_set_if_absent(&claim.key, &claim.value, identifier)?;
                }
            }
        }

        self.store.apply_batch(&plan.commands)?;

        let outcome = SaveOutcome {
            class: class.to_string(),
            identifier: identifier.to_string(),
            keys_touched: plan.keys_touched(),
            failures: plan.failures,
        };
        if outcome.failures.is_empty() {
            debug!(class, identifier, keys = outcome.keys_touched.len(), "saved");
        } else {
            warn!(
                class,
                identifier,
                failures = outcome.failures.len(),
                "saved with relationship failures"
            );
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Load
    // ------------------------------------------------------------------

    /// Load an object's fields from its backing hash.
    ///
    /// A miss is a normal `Ok(None)`, never an error. When the hash is gone
    /// but the registry still lists the identifier, the stale registry and
    /// index entries are pruned as a side effect (lazy ghost
    /// reconciliation). When the hash exists, the registry is left untouched
    /// even if the entry is missing -- an orphan is visible to authoritative
    /// counting, not silently repaired.
    pub fn load(&self, class: &str, identifier: &str) -> EngineResult<Option<FieldMap>> {
        validate_identifier(identifier)?;
        self.schema.descriptor(class)?;

        let fields = self.store.hash_get_all(&keys::object_key(class, identifier))?;
        if !fields.is_empty() {
            return Ok(Some(fields));
        }

        if instances::registered(self.store.as_ref(), class, identifier)? {
            let pruned = instances::reconcile_ghost(
                self.store.as_ref(),
                &self.schema,
                &self.config,
                class,
                identifier,
            )?;
            debug!(class, identifier, pruned = pruned.len(), "load miss pruned ghost");
        }
        Ok(None)
    }

    // ------------------------------------------------------------------
    // Destroy
    // ------------------------------------------------------------------

    /// Destroy an object, applying each relationship's cascade policy
    /// (overridden for all of them when `policy_override` is given).
    ///
    /// Always removes the backing hash, the instances registry entry, and
    /// the reverse membership registry, regardless of declarations.
    pub fn destroy(
        &self,
        entity: &dyn Entity,
        policy_override: Option<CascadePolicy>,
    ) -> EngineResult<CascadeReport> {
        let mut report = self.plan_destroy(entity, policy_override)?;
        cascade::execute(self.store.as_ref(), &mut report)?;
        debug!(
            class = report.class.as_str(),
            identifier = report.identifier.as_str(),
            removed = report.removed,
            "destroyed"
        );
        Ok(report)
    }

    /// Report the exact key set [`Engine::destroy`] would touch, without
    /// mutating anything.
    pub fn destroy_dry_run(
        &self,
        entity: &dyn Entity,
        policy_override: Option<CascadePolicy>,
    ) -> EngineResult<CascadeReport> {
        self.plan_destroy(entity, policy_override)
    }

    fn plan_destroy(
        &self,
        entity: &dyn Entity,
        policy_override: Option<CascadePolicy>,
    ) -> EngineResult<CascadeReport> {
        let class = entity.class();
        let identifier = entity.identifier();
        validate_identifier(identifier)?;

        // Prefer the stored field values for index cleanup; an object whose
        // hash already expired still prunes what its in-memory fields reach.
        let stored = self.store.hash_get_all(&keys::object_key(class, identifier))?;
        let fields = if stored.is_empty() {
            entity.fields()
        } else {
            stored
        };

        cascade::plan_destroy(
            &self.schema,
            &self.config,
            self.store.as_ref(),
            class,
            identifier,
            &fields,
            policy_override,
        )
    }

    // ------------------------------------------------------------------
    // Instances registry
    // ------------------------------------------------------------------

    /// Insert or refresh the registry entry at the current time.
    pub fn touch(&self, class: &str, identifier: &str) -> EngineResult<()> {
        validate_identifier(identifier)?;
        self.schema.descriptor(class)?;
        instances::touch(self.store.as_ref(), class, identifier, WriteStamp::now())?;
        Ok(())
    }

    /// Remove the registry entry. Removing an absent identifier is a no-op.
    pub fn unregister(&self, class: &str, identifier: &str) -> EngineResult<bool> {
        validate_identifier(identifier)?;
        instances::unregister(self.store.as_ref(), class, identifier)
    }

    /// Fast registration hint. Not authoritative: ghosts and orphans make it
    /// wrong in either direction until the next access reconciles.
    pub fn registered(&self, class: &str, identifier: &str) -> EngineResult<bool> {
        validate_identifier(identifier)?;
        instances::registered(self.store.as_ref(), class, identifier)
    }

    /// Fast instance count: the registry's cardinality. May overcount
    /// (ghosts) or undercount (orphans).
    pub fn count(&self, class: &str) -> EngineResult<u64> {
        self.schema.descriptor(class)?;
        Ok(self.store.sorted_len(&keys::instances_key(class))?)
    }

    /// Authoritative instance count: enumerates actual backing hashes by
    /// key-pattern scan. Never consults the registry; costs a keyspace scan.
    pub fn count_authoritative(&self, class: &str) -> EngineResult<u64> {
        Ok(self.scan_identifiers(class)?.len() as u64)
    }

    /// Authoritative identifier listing, by key-pattern scan of the backing
    /// hashes. Never consults the registry.
    pub fn scan_identifiers(&self, class: &str) -> EngineResult<Vec<String>> {
        self.schema.descriptor(class)?;
        let pattern = keys::object_scan_pattern(class);
        let prefix = format!("{class}:");
        let mut identifiers: Vec<String> = Vec::new();
        for key in self.store.scan_keys(&pattern, usize::MAX)? {
            let identifier = match key
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_suffix(":object"))
            {
                Some(identifier) => identifier,
                None => continue,
            };
            // The pattern can also match non-hash keys (an index bucket for
            // a value literally named "object"); only a non-empty hash
            // counts as a live object.
            match self.store.hash_get_all(&key) {
                Ok(fields) if !fields.is_empty() => identifiers.push(identifier.to_string()),
                Ok(_) => {}
                Err(StoreError::WrongKind { .. }) => {}
                Err(err) => return Err(err.into()),
            }
        }
        Ok(identifiers)
    }

    // ------------------------------------------------------------------
    // Counters
    // ------------------------------------------------------------------

    /// A handle to the named bounded counter.
    pub fn counter(&self, name: &str) -> EngineResult<BoundedCounter> {
        validate_identifier(name)?;
        Ok(BoundedCounter::new(Arc::clone(&self.store), name))
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("classes", &self.schema.classes().count())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::KeyOrigin;
    use crate::entity::GenericEntity;
    use lattice_schema::{
        ClassDescriptor, IndexScope, Relationship, ScoreSource, TrackingScope,
    };
    use lattice_store::MemoryStore;

    fn test_schema() -> Schema {
        let team = ClassDescriptor::builder("team").build().unwrap();
        let customer = ClassDescriptor::builder("customer")
            .identifier_field("custid")
            .relationship(Relationship::tracking(
                "created",
                TrackingScope::Class,
                ScoreSource::field("created_at"),
            ))
            .relationship(Relationship::unique_index("by-email", "email", IndexScope::Class))
            .relationship(Relationship::multi_index("by-plan", "plan", IndexScope::Class))
            .relationship(Relationship::membership("roster", "team", "team_id"))
            .build()
            .unwrap();
        let session = ClassDescriptor::builder("session")
            .identifier_field("sid")
            .relationship(Relationship::tracking(
                "activity",
                TrackingScope::Parent {
                    owner_class: "customer".into(),
                    owner_field: "custid".into(),
                },
                ScoreSource::field("last_seen"),
            ))
            .build()
            .unwrap();
        Schema::builder()
            .class(team)
            .class(customer)
            .class(session)
            .build()
            .unwrap()
    }

    fn engine() -> (Engine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let engine = Engine::new(store.clone(), Arc::new(test_schema()));
        (engine, store)
    }

    fn ada() -> GenericEntity {
        GenericEntity::new("customer", "c1")
            .with_field("created_at", "1700000000")
            .with_field("email", "ada@example.com")
            .with_field("plan", "pro")
            .with_field("team_id", "t1")
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    #[test]
    fn save_propagates_every_declaration() {
        let (engine, store) = engine();
        let outcome = engine.save(&ada()).unwrap();
        assert!(outcome.failures.is_empty());

        // Authoritative hash, with the identifier field filled in.
        let hash = store.hash_get_all("customer:c1:object").unwrap();
        assert_eq!(hash["custid"], "c1");
        assert_eq!(hash["email"], "ada@example.com");

        // Registry, tracking, indexes, membership (both directions).
        assert!(store.sorted_score("customer:instances", "c1").unwrap().is_some());
        assert_eq!(
            store.sorted_score("customer:created", "c1").unwrap(),
            Some(1_700_000_000.0)
        );
        assert_eq!(
            store.hash_get("customer:by-email", "ada@example.com").unwrap(),
            Some("c1".to_string())
        );
        assert!(store.set_contains("customer:by-plan:pro", "c1").unwrap());
        assert!(store.set_contains("team:t1:customer:roster", "c1").unwrap());
        assert!(store
            .set_contains("customer:c1:memberships", "team:t1:customer:roster")
            .unwrap());
    }

    #[test]
    fn save_is_idempotent() {
        let (engine, store) = engine();
        engine.save(&ada()).unwrap();
        let keys_after_first = store.all_keys();

        engine.save(&ada()).unwrap();
        assert_eq!(store.all_keys(), keys_after_first);
        assert_eq!(store.sorted_len("customer:created").unwrap(), 1);
        assert_eq!(store.sorted_len("customer:instances").unwrap(), 1);
        assert_eq!(store.set_members("customer:by-plan:pro").unwrap().len(), 1);
        assert_eq!(store.set_members("team:t1:customer:roster").unwrap().len(), 1);
    }

    #[test]
    fn save_rejects_empty_identifier_before_any_mutation() {
        let (engine, store) = engine();
        let err = engine.save(&GenericEntity::new("customer", "")).unwrap_err();
        assert!(matches!(err, EngineError::Ident(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn save_unknown_class_is_an_error() {
        let (engine, _) = engine();
        let err = engine.save(&GenericEntity::new("payment", "p1")).unwrap_err();
        assert!(matches!(err, EngineError::Schema(_)));
    }

    #[test]
    fn save_reports_score_failures_and_continues() {
        let (engine, store) = engine();
        let entity = GenericEntity::new("customer", "c9")
            .with_field("email", "nine@example.com")
            .with_field("plan", "free");
        let outcome = engine.save(&entity).unwrap();

        let failed: Vec<&str> = outcome.failures.iter().map(|f| f.relation.as_str()).collect();
        assert!(failed.contains(&"created"));
        assert!(failed.contains(&"roster"));
        // Unaffected relationships still landed.
        assert!(store.set_contains("customer:by-plan:free", "c9").unwrap());
        assert_eq!(
            store.hash_get("customer:by-email", "nine@example.com").unwrap(),
            Some("c9".to_string())
        );
    }

    // -----------------------------------------------------------------------
    // Unique index
    // -----------------------------------------------------------------------

    #[test]
    fn unique_index_conflict_is_a_validation_error() {
        let (engine, store) = engine();
        engine.save(&ada()).unwrap();

        let impostor = GenericEntity::new("customer", "c2")
            .with_field("created_at", "1700000001")
            .with_field("email", "ada@example.com")
            .with_field("plan", "free")
            .with_field("team_id", "t1");
        let err = engine.save(&impostor).unwrap_err();
        match err {
            EngineError::UniqueIndexConflict {
                index,
                value,
                existing,
                incoming,
                ..
            } => {
                assert_eq!(index, "by-email");
                assert_eq!(value, "ada@example.com");
                assert_eq!(existing, "c1");
                assert_eq!(incoming, "c2");
            }
            other => panic!("unexpected error: {other}"),
        }
        // The original mapping is never overwritten.
        assert_eq!(
            store.hash_get("customer:by-email", "ada@example.com").unwrap(),
            Some("c1".to_string())
        );
        // The conflicting save was aborted before the batch: no hash, no
        // registry entry for c2.
        assert!(!store.exists("customer:c2:object").unwrap());
        assert!(store.sorted_score("customer:instances", "c2").unwrap().is_none());
    }

    #[test]
    fn resaving_the_same_identifier_refreshes_not_conflicts() {
        let (engine, _) = engine();
        engine.save(&ada()).unwrap();
        engine.save(&ada()).unwrap();
    }

    #[test]
    fn changed_index_value_claims_new_slot_and_leaves_stale_one() {
        let (engine, store) = engine();
        engine.save(&ada()).unwrap();

        let mut moved = ada();
        moved.set_field("email", "ada@new.example.com");
        engine.save(&moved).unwrap();

        // New slot claimed; the old entry stays until reconciled or
        // explicitly removed (no automatic compaction).
        assert_eq!(
            store.hash_get("customer:by-email", "ada@new.example.com").unwrap(),
            Some("c1".to_string())
        );
        assert_eq!(
            store.hash_get("customer:by-email", "ada@example.com").unwrap(),
            Some("c1".to_string())
        );
    }

    #[test]
    fn tracking_scores_interoperate_with_the_codec() {
        let (engine, store) = engine();
        // A creation stamp with auxiliary metadata in the fractional slot,
        // serialized into the score field like any other value.
        let score = lattice_score::encode(1_700_000_000, 37).unwrap();
        let entity = GenericEntity::new("customer", "c1")
            .with_field("created_at", score.to_string())
            .with_field("email", "ada@example.com")
            .with_field("plan", "pro")
            .with_field("team_id", "t1");
        engine.save(&entity).unwrap();

        let stored = store.sorted_score("customer:created", "c1").unwrap().unwrap();
        let decoded = lattice_score::decode(stored).unwrap();
        assert_eq!(decoded.timestamp, 1_700_000_000);
        assert_eq!(decoded.aux, 37);
    }

    // -----------------------------------------------------------------------
    // Load and ghost reconciliation
    // -----------------------------------------------------------------------

    #[test]
    fn load_returns_fields_for_live_objects() {
        let (engine, _) = engine();
        engine.save(&ada()).unwrap();
        let fields = engine.load("customer", "c1").unwrap().unwrap();
        assert_eq!(fields["email"], "ada@example.com");
    }

    #[test]
    fn load_miss_is_not_an_error() {
        let (engine, _) = engine();
        assert!(engine.load("customer", "never-saved").unwrap().is_none());
    }

    #[test]
    fn load_prunes_ghost_entries_lazily() {
        let (engine, store) = engine();
        engine.save(&ada()).unwrap();

        // Out-of-band deletion (TTL expiry, external client).
        store.delete("customer:c1:object").unwrap();

        // The registry still hints existence until the next access.
        assert!(engine.registered("customer", "c1").unwrap());

        assert!(engine.load("customer", "c1").unwrap().is_none());

        // One load later, every stale reference is gone.
        assert!(!engine.registered("customer", "c1").unwrap());
        assert!(store.sorted_score("customer:created", "c1").unwrap().is_none());
        assert_eq!(store.hash_get("customer:by-email", "ada@example.com").unwrap(), None);
        assert!(!store.set_contains("customer:by-plan:pro", "c1").unwrap());
        assert!(!store.set_contains("team:t1:customer:roster", "c1").unwrap());
        assert!(!store.exists("customer:c1:memberships").unwrap());
    }

    #[test]
    fn load_leaves_orphans_unrepaired() {
        let (engine, store) = engine();
        // A write path that bypassed the registry.
        store
            .hash_set(
                "customer:c7:object",
                &[("custid".to_string(), "c7".to_string())],
            )
            .unwrap();

        let fields = engine.load("customer", "c7").unwrap().unwrap();
        assert_eq!(fields["custid"], "c7");
        // Still an orphan: load never writes the registry.
        assert!(!engine.registered("customer", "c7").unwrap());
    }

    // -----------------------------------------------------------------------
    // Fast vs authoritative counts
    // -----------------------------------------------------------------------

    #[test]
    fn counts_diverge_under_ghosts_and_orphans() {
        let (engine, store) = engine();
        engine.save(&ada()).unwrap();
        let bob = GenericEntity::new("customer", "c2")
            .with_field("created_at", "1700000002")
            .with_field("email", "bob@example.com")
            .with_field("plan", "free")
            .with_field("team_id", "t1");
        engine.save(&bob).unwrap();

        // Ghost: registered, but the hash is gone.
        store.delete("customer:c2:object").unwrap();
        assert_eq!(engine.count("customer").unwrap(), 2);
        assert_eq!(engine.count_authoritative("customer").unwrap(), 1);

        // Orphan: a hash with no registration.
        store
            .hash_set(
                "customer:c3:object",
                &[("custid".to_string(), "c3".to_string())],
            )
            .unwrap();
        assert_eq!(engine.count("customer").unwrap(), 2);
        assert_eq!(engine.count_authoritative("customer").unwrap(), 2);

        let mut ids = engine.scan_identifiers("customer").unwrap();
        ids.sort();
        assert_eq!(ids, vec!["c1".to_string(), "c3".to_string()]);
    }

    // -----------------------------------------------------------------------
    // Destroy and cascade
    // -----------------------------------------------------------------------

    #[test]
    fn destroy_removes_every_declared_entry() {
        let (engine, store) = engine();
        engine.save(&ada()).unwrap();

        let report = engine.destroy(&ada(), None).unwrap();
        assert!(report.executed);
        assert!(report.removed > 0);

        assert!(!store.exists("customer:c1:object").unwrap());
        assert!(!engine.registered("customer", "c1").unwrap());
        assert!(store.sorted_score("customer:created", "c1").unwrap().is_none());
        assert_eq!(store.hash_get("customer:by-email", "ada@example.com").unwrap(), None);
        assert!(!store.set_contains("customer:by-plan:pro", "c1").unwrap());
        assert!(!store.set_contains("team:t1:customer:roster", "c1").unwrap());
        assert!(!store.exists("customer:c1:memberships").unwrap());
        assert!(engine.load("customer", "c1").unwrap().is_none());
    }

    #[test]
    fn dry_run_reports_the_same_keys_destroy_mutates() {
        let (engine, store) = engine();
        engine.save(&ada()).unwrap();

        let dry = engine.destroy_dry_run(&ada(), None).unwrap();
        assert!(!dry.executed);
        assert_eq!(dry.removed, 0);
        // Dry run mutates nothing.
        assert!(store.exists("customer:c1:object").unwrap());

        let real = engine.destroy(&ada(), None).unwrap();
        assert_eq!(dry.affected_keys(), real.affected_keys());
    }

    #[test]
    fn destroy_never_unmaps_a_successors_unique_claim() {
        let (engine, store) = engine();
        engine.save(&ada()).unwrap();
        // c1's slot is taken over after its hash expires out-of-band.
        store.delete("customer:c1:object").unwrap();
        store.hash_delete("customer:by-email", "ada@example.com").unwrap();
        let successor = GenericEntity::new("customer", "c2")
            .with_field("created_at", "1700000005")
            .with_field("email", "ada@example.com")
            .with_field("plan", "free")
            .with_field("team_id", "t1");
        engine.save(&successor).unwrap();

        engine.destroy(&ada(), None).unwrap();
        assert_eq!(
            store.hash_get("customer:by-email", "ada@example.com").unwrap(),
            Some("c2".to_string())
        );
    }

    #[test]
    fn ignore_policy_leaves_stale_entries_for_the_reconciler() {
        let (engine, store) = engine();
        engine.save(&ada()).unwrap();

        engine.destroy(&ada(), Some(CascadePolicy::Ignore)).unwrap();

        // Declared entries stay (the accepted, documented inconsistency)...
        assert_eq!(store.sorted_len("customer:created").unwrap(), 1);
        assert!(store.set_contains("customer:by-plan:pro", "c1").unwrap());
        // ...while the bookkeeping is always cleaned.
        assert!(!store.exists("customer:c1:object").unwrap());
        assert!(!engine.registered("customer", "c1").unwrap());

        // The ghost reconciler needs a registry hint to fire; re-register
        // the ghost as an out-of-band writer would, then load.
        engine.touch("customer", "c1").unwrap();
        assert!(engine.load("customer", "c1").unwrap().is_none());
        assert_eq!(store.sorted_len("customer:created").unwrap(), 0);
        assert!(!store.set_contains("customer:by-plan:pro", "c1").unwrap());
    }

    #[test]
    fn cascade_discovers_entries_the_current_fields_miss() {
        let (engine, store) = engine();
        let mut session = GenericEntity::new("session", "s1")
            .with_field("last_seen", "1700000100")
            .with_field("custid", "c1");
        engine.save(&session).unwrap();

        // The owner moved; the old collection still holds s1.
        session.set_field("custid", "c2");
        engine.save(&session).unwrap();
        assert!(store
            .sorted_score("customer:c1:session:activity", "s1")
            .unwrap()
            .is_some());

        let report = engine.destroy(&session, Some(CascadePolicy::Cascade)).unwrap();
        assert!(report
            .affected
            .iter()
            .any(|entry| entry.origin == KeyOrigin::Discovered));
        assert!(store
            .sorted_score("customer:c1:session:activity", "s1")
            .unwrap()
            .is_none());
        assert!(store
            .sorted_score("customer:c2:session:activity", "s1")
            .unwrap()
            .is_none());
    }

    #[test]
    fn cascade_deletes_collections_the_object_owns() {
        let (engine, store) = engine();
        engine.save(&ada()).unwrap();
        let session = GenericEntity::new("session", "s1")
            .with_field("last_seen", "1700000100")
            .with_field("custid", "c1");
        engine.save(&session).unwrap();
        assert!(store.exists("customer:c1:session:activity").unwrap());

        engine.destroy(&ada(), Some(CascadePolicy::Cascade)).unwrap();
        assert!(!store.exists("customer:c1:session:activity").unwrap());
    }

    #[test]
    fn destroy_with_nothing_to_discover_succeeds() {
        let (engine, _) = engine();
        let report = engine
            .destroy(&ada(), Some(CascadePolicy::Cascade))
            .unwrap();
        // Nothing found is not an error; base keys are still in the plan.
        assert!(report
            .affected
            .iter()
            .all(|entry| entry.origin != KeyOrigin::Discovered));
    }

    // -----------------------------------------------------------------------
    // Registry operations
    // -----------------------------------------------------------------------

    #[test]
    fn touch_is_idempotent_and_unregister_tolerates_absence() {
        let (engine, store) = engine();
        engine.touch("customer", "c1").unwrap();
        engine.touch("customer", "c1").unwrap();
        assert_eq!(store.sorted_len("customer:instances").unwrap(), 1);

        assert!(engine.unregister("customer", "c1").unwrap());
        assert!(!engine.unregister("customer", "c1").unwrap());
    }

    // -----------------------------------------------------------------------
    // Bounded counter
    // -----------------------------------------------------------------------

    #[test]
    fn counter_respects_threshold() {
        let (engine, _) = engine();
        let counter = engine.counter("api-calls").unwrap();
        assert_eq!(counter.increment_if_less_than(2, 1).unwrap(), Some(1));
        assert_eq!(counter.increment_if_less_than(2, 1).unwrap(), Some(2));
        assert_eq!(counter.increment_if_less_than(2, 1).unwrap(), None);
        assert_eq!(counter.value().unwrap(), 2);
    }

    #[test]
    fn counter_validates_arguments() {
        let (engine, _) = engine();
        let counter = engine.counter("api-calls").unwrap();
        assert!(matches!(
            counter.increment_if_less_than(0, 1).unwrap_err(),
            EngineError::InvalidCounterArgs { .. }
        ));
        assert!(matches!(
            counter.increment_if_less_than(10, -1).unwrap_err(),
            EngineError::InvalidCounterArgs { .. }
        ));
        assert!(engine.counter("bad:name").is_err());
    }

    #[test]
    fn counter_holds_threshold_under_concurrent_callers() {
        use std::thread;

        let (engine, _) = engine();
        let threshold = 40;
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = engine.counter("shared").unwrap();
                thread::spawn(move || {
                    let mut successes = 0i64;
                    for _ in 0..10 {
                        if counter
                            .increment_if_less_than(threshold, 1)
                            .unwrap()
                            .is_some()
                        {
                            successes += 1;
                        }
                    }
                    successes
                })
            })
            .collect();

        let total: i64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, threshold);
        let counter = engine.counter("shared").unwrap();
        assert_eq!(counter.value().unwrap(), threshold);
    }

    // -----------------------------------------------------------------------
    // Ambient schema
    // -----------------------------------------------------------------------

    #[test]
    fn from_installed_requires_an_installed_schema() {
        // This is the only test in this crate touching the process-wide
        // schema cell.
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        match Engine::from_installed(store.clone()) {
            Err(EngineError::SchemaNotInstalled) => {
                lattice_schema::install(test_schema()).unwrap();
                let engine = Engine::from_installed(store).unwrap();
                engine.save(&ada()).unwrap();
            }
            Ok(_) => panic!("no schema should be installed yet"),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
