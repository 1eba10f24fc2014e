//! Integration tests for the inventory store against in-memory SQLite.
//!
//! Tests: InventoryStore → QueryAdapter → SQLite
//!
//! Verifies:
//! - Category find-or-create on item insert
//! - Grouping, ordering and empty categories in the inventory listing
//! - Batch semantics: sequential, no-op on missing ids, prefix commit on failure
//! - Quantities stay within the INTEGER columns
//! - Generated ids are required on insert
//! - Fail-fast behavior when the schema is unavailable

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use pantry_core::{CategoryId, DomainError, ItemId};
    use pantry_inventory::{
        CategoryOrder, CountUpdate, Item, ItemUpdate, MAX_COLUMN_VALUE, NewItem, PurchaseUpdate,
    };

    use crate::db::{Engine, QueryAdapter, QueryError, QueryOutcome, SqlValue, SqliteAdapter};
    use crate::schema::SchemaStatus;
    use crate::store::{BatchOutcome, ErrorKind, InventoryError, InventoryStore};

    async fn setup() -> (InventoryStore, Arc<dyn QueryAdapter>) {
        let db: Arc<dyn QueryAdapter> =
            Arc::new(SqliteAdapter::connect("sqlite::memory:").await.unwrap());
        let store = InventoryStore::open(Arc::clone(&db)).await;
        assert_eq!(store.schema_status(), &SchemaStatus::Ready);
        (store, db)
    }

    async fn add(store: &InventoryStore, genre: &str, name: &str, min: i64, current: i64) -> Item {
        store
            .add_item(NewItem::new(genre, name, min, current).unwrap())
            .await
            .unwrap()
    }

    async fn category_count(db: &Arc<dyn QueryAdapter>) -> usize {
        db.execute("SELECT id FROM genres", &[]).await.unwrap().rows.len()
    }

    async fn current_quantity(store: &InventoryStore, id: ItemId) -> i64 {
        store
            .list_inventory()
            .await
            .unwrap()
            .into_iter()
            .flat_map(|c| c.items)
            .find(|i| i.id == id)
            .map(|i| i.current_quantity)
            .unwrap()
    }

    /// Delegates to `inner`, failing the `fail_on`-th UPDATE (0-based).
    struct FailingUpdates {
        inner: Arc<dyn QueryAdapter>,
        fail_on: usize,
        updates: AtomicUsize,
        statements: AtomicUsize,
    }

    impl FailingUpdates {
        fn new(inner: Arc<dyn QueryAdapter>, fail_on: usize) -> Self {
            Self {
                inner,
                fail_on,
                updates: AtomicUsize::new(0),
                statements: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl QueryAdapter for FailingUpdates {
        fn engine(&self) -> Engine {
            self.inner.engine()
        }

        async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutcome, QueryError> {
            self.statements.fetch_add(1, Ordering::SeqCst);
            if sql.starts_with("UPDATE") && self.updates.fetch_add(1, Ordering::SeqCst) == self.fail_on
            {
                return Err(QueryError::Engine {
                    statement: sql.to_string(),
                    code: None,
                    message: "database is locked".into(),
                });
            }
            self.inner.execute(sql, params).await
        }
    }

    /// Delegates to `inner` but drops the generated id of category inserts.
    struct NoCategoryId {
        inner: Arc<dyn QueryAdapter>,
    }

    #[async_trait]
    impl QueryAdapter for NoCategoryId {
        fn engine(&self) -> Engine {
            self.inner.engine()
        }

        async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<QueryOutcome, QueryError> {
            let mut outcome = self.inner.execute(sql, params).await?;
            if sql.starts_with("INSERT INTO genres") {
                outcome.last_insert_id = None;
            }
            Ok(outcome)
        }
    }

    #[tokio::test]
    async fn new_category_is_created_once_and_then_reused() {
        let (store, db) = setup().await;

        let carrot = add(&store, "produce", "carrot", 2, 0).await;
        assert_eq!(category_count(&db).await, 1);

        let apple = add(&store, "produce", "apple", 1, 1).await;
        assert_eq!(category_count(&db).await, 1);
        assert_eq!(apple.category_id, carrot.category_id);

        let milk = add(&store, "dairy", "milk", 1, 0).await;
        assert_eq!(category_count(&db).await, 2);
        assert_ne!(milk.category_id, carrot.category_id);
    }

    #[tokio::test]
    async fn produce_carrot_scenario() {
        let (store, _db) = setup().await;

        let carrot = add(&store, "produce", "carrot", 2, 0).await;
        let inventory = store.list_inventory().await.unwrap();

        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory[0].name, "produce");
        assert_eq!(Some(inventory[0].id), carrot.category_id);
        assert_eq!(inventory[0].items.len(), 1);
        let item = &inventory[0].items[0];
        assert_eq!(item.name, "carrot");
        assert_eq!(item.min_quantity, 2);
        assert_eq!(item.current_quantity, 0);
        assert_eq!(item, &carrot);
    }

    #[tokio::test]
    async fn categories_without_items_are_listed_empty() {
        let (store, _db) = setup().await;

        let milk = add(&store, "dairy", "milk", 1, 0).await;
        add(&store, "produce", "carrot", 2, 0).await;
        assert_eq!(store.delete_item(milk.id).await.unwrap(), 1);

        let inventory = store.list_inventory().await.unwrap();
        assert_eq!(inventory.len(), 2);
        assert_eq!(inventory[0].name, "dairy");
        assert!(inventory[0].items.is_empty());
        assert_eq!(inventory[1].items.len(), 1);
    }

    #[tokio::test]
    async fn listing_follows_display_order() {
        let (store, db) = setup().await;

        let carrot = add(&store, "produce", "carrot", 1, 0).await;
        let apple = add(&store, "produce", "apple", 1, 0).await;
        let milk = add(&store, "dairy", "milk", 1, 0).await;

        let produce = carrot.category_id.unwrap();
        let dairy = milk.category_id.unwrap();
        store
            .reorder_categories(&[
                CategoryOrder { category_id: produce, order: 2 },
                CategoryOrder { category_id: dairy, order: 1 },
            ])
            .await
            .unwrap();
        db.execute(
            r#"UPDATE items SET "order" = ? WHERE id = ?"#,
            &[SqlValue::Int(5), SqlValue::Int(carrot.id.get())],
        )
        .await
        .unwrap();
        db.execute(
            r#"UPDATE items SET "order" = ? WHERE id = ?"#,
            &[SqlValue::Int(1), SqlValue::Int(apple.id.get())],
        )
        .await
        .unwrap();

        let inventory = store.list_inventory().await.unwrap();
        let names: Vec<_> = inventory.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["dairy", "produce"]);
        let produce_items: Vec<_> = inventory[1].items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(produce_items, ["apple", "carrot"]);

        let categories = store.list_categories().await.unwrap();
        assert_eq!(categories[0].id, dairy);
        assert_eq!(categories[0].order, 1);
        assert_eq!(categories[1].id, produce);
    }

    #[tokio::test]
    async fn equal_orders_fall_back_to_creation_order() {
        let (store, _db) = setup().await;
        add(&store, "b-genre", "x", 1, 0).await;
        add(&store, "a-genre", "y", 1, 0).await;
        add(&store, "b-genre", "z", 1, 0).await;

        let first = store.list_inventory().await.unwrap();
        let second = store.list_inventory().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].name, "b-genre");
        let items: Vec<_> = first[0].items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(items, ["x", "z"]);
    }

    #[tokio::test]
    async fn apply_counts_sets_absolute_quantity() {
        let (store, _db) = setup().await;
        let carrot = add(&store, "produce", "carrot", 2, 9).await;

        let outcome = store
            .apply_counts(&[CountUpdate { item_id: carrot.id, current_quantity: 5 }])
            .await
            .unwrap();

        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(current_quantity(&store, carrot.id).await, 5);
    }

    #[tokio::test]
    async fn apply_purchases_increments_quantity() {
        let (store, _db) = setup().await;
        let carrot = add(&store, "produce", "carrot", 2, 4).await;

        store
            .apply_purchases(&[PurchaseUpdate { item_id: carrot.id, purchased_quantity: 3 }])
            .await
            .unwrap();
        assert_eq!(current_quantity(&store, carrot.id).await, 7);
    }

    #[tokio::test]
    async fn missing_ids_are_noops() {
        let (store, _db) = setup().await;
        let carrot = add(&store, "produce", "carrot", 2, 0).await;
        let milk = add(&store, "dairy", "milk", 1, 0).await;

        assert_eq!(store.delete_item(ItemId::new(999)).await.unwrap(), 0);

        let outcome = store
            .apply_counts(&[
                CountUpdate { item_id: carrot.id, current_quantity: 3 },
                CountUpdate { item_id: ItemId::new(999), current_quantity: 8 },
                CountUpdate { item_id: milk.id, current_quantity: 6 },
            ])
            .await
            .unwrap();

        assert_eq!(
            outcome,
            BatchOutcome { attempted: 3, rows_affected: 2, missing: vec![1] }
        );
        assert_eq!(current_quantity(&store, carrot.id).await, 3);
        assert_eq!(current_quantity(&store, milk.id).await, 6);
    }

    #[tokio::test]
    async fn empty_batches_execute_nothing() {
        let (store, db) = setup().await;
        let counting = Arc::new(FailingUpdates::new(db, usize::MAX));
        let store_over_counter = InventoryStore::new(counting.clone(), SchemaStatus::Ready);
        drop(store);

        assert_eq!(store_over_counter.apply_counts(&[]).await.unwrap(), BatchOutcome::default());
        assert_eq!(store_over_counter.apply_purchases(&[]).await.unwrap(), BatchOutcome::default());
        assert_eq!(
            store_over_counter.reorder_categories(&[]).await.unwrap(),
            BatchOutcome::default()
        );
        assert_eq!(counting.statements.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_entry_keeps_prefix_and_skips_the_rest() {
        let (store, db) = setup().await;
        let a = add(&store, "produce", "a", 1, 0).await;
        let b = add(&store, "produce", "b", 1, 0).await;
        let c = add(&store, "produce", "c", 1, 0).await;

        let failing = InventoryStore::new(
            Arc::new(FailingUpdates::new(Arc::clone(&db), 1)),
            SchemaStatus::Ready,
        );
        let err = failing
            .apply_counts(&[
                CountUpdate { item_id: a.id, current_quantity: 4 },
                CountUpdate { item_id: b.id, current_quantity: 4 },
                CountUpdate { item_id: c.id, current_quantity: 4 },
            ])
            .await
            .unwrap_err();

        match &err {
            InventoryError::Batch { index, committed, source } => {
                assert_eq!(*index, 1);
                assert_eq!(*committed, 1);
                assert!(source.to_string().contains("database is locked"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.is_retryable());

        assert_eq!(current_quantity(&store, a.id).await, 4);
        assert_eq!(current_quantity(&store, b.id).await, 0);
        assert_eq!(current_quantity(&store, c.id).await, 0);
    }

    #[tokio::test]
    async fn update_item_replaces_fields() {
        let (store, _db) = setup().await;
        let carrot = add(&store, "produce", "carrot", 2, 0).await;
        let milk = add(&store, "dairy", "milk", 1, 0).await;

        let affected = store
            .update_item(ItemUpdate {
                id: carrot.id,
                name: "baby carrot".into(),
                min_quantity: 4,
                current_quantity: 1,
                category_id: milk.category_id,
            })
            .await
            .unwrap();
        assert_eq!(affected, 1);

        let inventory = store.list_inventory().await.unwrap();
        let dairy = inventory.iter().find(|c| Some(c.id) == milk.category_id).unwrap();
        let moved = dairy.items.iter().find(|i| i.id == carrot.id).unwrap();
        assert_eq!(moved.name, "baby carrot");
        assert_eq!(moved.min_quantity, 4);
        assert_eq!(moved.current_quantity, 1);

        let missing = store
            .update_item(ItemUpdate {
                id: ItemId::new(999),
                name: "ghost".into(),
                min_quantity: 1,
                current_quantity: 0,
                category_id: None,
            })
            .await
            .unwrap();
        assert_eq!(missing, 0);
    }

    #[tokio::test]
    async fn shopping_list_flags_shortfall() {
        let (store, _db) = setup().await;
        add(&store, "produce", "carrot", 3, 1).await;
        add(&store, "produce", "apple", 1, 5).await;

        let list = store.shopping_list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "carrot");
        assert_eq!(list[0].category_name, "produce");
        assert_eq!(list[0].to_buy, 2);
    }

    #[tokio::test]
    async fn invalid_input_executes_nothing() {
        let (_store, db) = setup().await;
        let counting = Arc::new(FailingUpdates::new(db, usize::MAX));
        let store = InventoryStore::new(counting.clone(), SchemaStatus::Ready);

        assert!(matches!(
            NewItem::new("", "carrot", 1, 0),
            Err(DomainError::Validation(_))
        ));

        let err = store
            .update_item(ItemUpdate {
                id: ItemId::new(1),
                name: "".into(),
                min_quantity: 1,
                current_quantity: 0,
                category_id: Some(CategoryId::new(1)),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = store
            .apply_counts(&[
                CountUpdate { item_id: ItemId::new(1), current_quantity: 1 },
                CountUpdate { item_id: ItemId::new(2), current_quantity: -1 },
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));
        assert!(!err.is_retryable());

        assert_eq!(counting.statements.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unavailable_schema_fails_fast() {
        let (_store, db) = setup().await;
        let counting = Arc::new(FailingUpdates::new(db, usize::MAX));
        let store = InventoryStore::new(
            counting.clone(),
            SchemaStatus::Unavailable { reason: "genres table: disk I/O error".into() },
        );

        let err = store.list_inventory().await.unwrap_err();
        assert!(matches!(err, InventoryError::SchemaUnavailable { .. }));
        assert_eq!(err.kind(), ErrorKind::Engine);

        let err = store
            .add_item(NewItem::new("produce", "carrot", 1, 0).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::SchemaUnavailable { .. }));
        assert!(store.delete_item(ItemId::new(1)).await.is_err());

        assert_eq!(counting.statements.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_share_one_new_category() {
        let (store, db) = setup().await;
        let store = Arc::new(store);

        let tasks: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .add_item(NewItem::new("pantry", format!("item-{n}"), 1, 0).unwrap())
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut categories = Vec::new();
        for task in tasks {
            categories.push(task.await.unwrap().category_id);
        }

        assert_eq!(category_count(&db).await, 1);
        assert!(categories.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.list_inventory().await.unwrap()[0].items.len(), 8);
    }

    #[tokio::test]
    async fn failed_purchase_keeps_prefix_and_skips_the_rest() {
        let (store, db) = setup().await;
        let a = add(&store, "produce", "a", 1, 1).await;
        let b = add(&store, "produce", "b", 1, 1).await;
        let c = add(&store, "produce", "c", 1, 1).await;

        let failing = InventoryStore::new(
            Arc::new(FailingUpdates::new(Arc::clone(&db), 1)),
            SchemaStatus::Ready,
        );
        let err = failing
            .apply_purchases(&[
                PurchaseUpdate { item_id: a.id, purchased_quantity: 2 },
                PurchaseUpdate { item_id: b.id, purchased_quantity: 2 },
                PurchaseUpdate { item_id: c.id, purchased_quantity: 2 },
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, InventoryError::Batch { index: 1, committed: 1, .. }));
        assert_eq!(current_quantity(&store, a.id).await, 3);
        assert_eq!(current_quantity(&store, b.id).await, 1);
        assert_eq!(current_quantity(&store, c.id).await, 1);
    }

    #[tokio::test]
    async fn failed_reorder_keeps_prefix_and_skips_the_rest() {
        let (store, db) = setup().await;
        let produce = add(&store, "produce", "carrot", 1, 0).await.category_id.unwrap();
        let dairy = add(&store, "dairy", "milk", 1, 0).await.category_id.unwrap();
        let bakery = add(&store, "bakery", "bread", 1, 0).await.category_id.unwrap();

        let failing = InventoryStore::new(
            Arc::new(FailingUpdates::new(Arc::clone(&db), 1)),
            SchemaStatus::Ready,
        );
        let err = failing
            .reorder_categories(&[
                CategoryOrder { category_id: bakery, order: 1 },
                CategoryOrder { category_id: dairy, order: 2 },
                CategoryOrder { category_id: produce, order: 3 },
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, InventoryError::Batch { index: 1, committed: 1, .. }));
        let orders: Vec<_> = store
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| (c.id, c.order))
            .collect();
        assert_eq!(orders, [(produce, 0), (dairy, 0), (bakery, 1)]);
    }

    #[tokio::test]
    async fn out_of_range_quantities_execute_nothing() {
        let (store, db) = setup().await;
        let carrot = add(&store, "produce", "carrot", 1, 1).await;
        let counting = Arc::new(FailingUpdates::new(db, usize::MAX));
        let guarded = InventoryStore::new(counting.clone(), SchemaStatus::Ready);

        let err = guarded
            .apply_purchases(&[PurchaseUpdate { item_id: carrot.id, purchased_quantity: i64::MAX }])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = guarded
            .apply_counts(&[CountUpdate { item_id: carrot.id, current_quantity: 3_000_000_000 }])
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));

        let err = guarded
            .reorder_categories(&[CategoryOrder {
                category_id: carrot.category_id.unwrap(),
                order: MAX_COLUMN_VALUE + 1,
            }])
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Validation(_)));

        let err = guarded
            .update_item(ItemUpdate {
                id: carrot.id,
                name: "carrot".into(),
                min_quantity: 3_000_000_000,
                current_quantity: 1,
                category_id: carrot.category_id,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert!(NewItem::new("produce", "apple", 1, MAX_COLUMN_VALUE + 1).is_err());
        assert_eq!(counting.statements.load(Ordering::SeqCst), 0);
        assert_eq!(current_quantity(&store, carrot.id).await, 1);
    }

    #[tokio::test]
    async fn purchase_past_the_column_limit_is_refused() {
        let (store, _db) = setup().await;
        let carrot = add(&store, "produce", "carrot", 1, 1).await;
        let apple = add(&store, "produce", "apple", 1, 0).await;

        let err = store
            .apply_purchases(&[
                PurchaseUpdate { item_id: apple.id, purchased_quantity: 2 },
                PurchaseUpdate { item_id: carrot.id, purchased_quantity: MAX_COLUMN_VALUE },
                PurchaseUpdate { item_id: apple.id, purchased_quantity: 5 },
            ])
            .await
            .unwrap_err();

        match &err {
            InventoryError::QuantityOverflow { index, committed, item_id } => {
                assert_eq!(*index, 1);
                assert_eq!(*committed, 1);
                assert_eq!(*item_id, carrot.id);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.is_retryable());

        // The listing still decodes every row.
        assert_eq!(current_quantity(&store, carrot.id).await, 1);
        assert_eq!(current_quantity(&store, apple.id).await, 2);

        // Reaching the limit exactly is allowed.
        let outcome = store
            .apply_purchases(&[PurchaseUpdate {
                item_id: carrot.id,
                purchased_quantity: MAX_COLUMN_VALUE - 1,
            }])
            .await
            .unwrap();
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(current_quantity(&store, carrot.id).await, MAX_COLUMN_VALUE);
    }

    #[tokio::test]
    async fn purchases_of_missing_ids_are_noops() {
        let (store, _db) = setup().await;
        let carrot = add(&store, "produce", "carrot", 1, 0).await;

        let outcome = store
            .apply_purchases(&[
                PurchaseUpdate { item_id: ItemId::new(999), purchased_quantity: 1 },
                PurchaseUpdate { item_id: carrot.id, purchased_quantity: 1 },
            ])
            .await
            .unwrap();

        assert_eq!(
            outcome,
            BatchOutcome { attempted: 2, rows_affected: 1, missing: vec![0] }
        );
        assert_eq!(current_quantity(&store, carrot.id).await, 1);
    }

    #[tokio::test]
    async fn category_insert_without_generated_id_stops_add_item() {
        let (_store, db) = setup().await;
        let store = InventoryStore::new(
            Arc::new(NoCategoryId { inner: Arc::clone(&db) }),
            SchemaStatus::Ready,
        );

        let err = store
            .add_item(NewItem::new("produce", "carrot", 1, 0).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            InventoryError::Query(QueryError::MissingGeneratedId { .. })
        ));
        assert!(err.is_retryable());
        let items = db.execute("SELECT id FROM items", &[]).await.unwrap();
        assert!(items.rows.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_purchases_all_land() {
        let (store, _db) = setup().await;
        let carrot = add(&store, "produce", "carrot", 1, 5).await;
        let store = Arc::new(store);

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .apply_purchases(&[PurchaseUpdate {
                            item_id: carrot.id,
                            purchased_quantity: 1,
                        }])
                        .await
                        .unwrap()
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().rows_affected, 1);
        }
        assert_eq!(current_quantity(&store, carrot.id).await, 21);
    }
}
