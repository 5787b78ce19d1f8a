// tests/persistence_integration.rs

//! 集成测试：save 生命周期
//! - 命名空间 / key
//! - 脏状态
//! - 回调顺序
//! - create / try_create 与失败路径

use serde_json::{json, Value};

use modis::{
    AttributeType, MemoryStore, Modis, Model, ModelDefinition, ModelHandle, ModisError, Record,
};
use std::sync::Arc;

#[derive(Default)]
struct MockModel {
    called_callbacks: Vec<&'static str>,
}

fn record_call(r: &mut Record<MockModel>, name: &'static str) {
    r.model_mut().called_callbacks.push(name);
}

impl Model for MockModel {
    const TYPE_NAME: &'static str = "PersistenceSpec::MockModel";

    fn define(def: &mut ModelDefinition<Self>) {
        def.attribute("name", AttributeType::String).default("Ian");
        def.validates_presence_of("name");

        def.before_create(|r: &mut Record<MockModel>| record_call(r, "before_create"));
        def.after_create(|r: &mut Record<MockModel>| record_call(r, "after_create"));
        def.before_update(|r: &mut Record<MockModel>| record_call(r, "before_update"));
        def.after_update(|r: &mut Record<MockModel>| record_call(r, "after_update"));
        def.before_save(|r: &mut Record<MockModel>| record_call(r, "before_save"));
        def.after_save(|r: &mut Record<MockModel>| record_call(r, "after_save"));
    }
}

#[derive(Default)]
struct InnerModel;

impl Model for InnerModel {
    const TYPE_NAME: &'static str = "Outer::InnerModel";

    fn define(def: &mut ModelDefinition<Self>) {
        def.attribute("title", AttributeType::String);
    }
}

fn setup() -> (Modis, ModelHandle<MockModel>) {
    let modis = Modis::in_memory();
    let models = modis.model::<MockModel>();
    (modis, models)
}

// ---------- 命名空间 ----------

#[test]
fn test_namespace() {
    let (_modis, models) = setup();
    assert_eq!(models.namespace(), "persistence_spec:mock_model");
    assert_eq!(models.absolute_namespace(), "modis:persistence_spec:mock_model");
}

#[test]
fn test_nested_type_namespace() {
    let modis = Modis::in_memory();
    let inner = modis.model::<InnerModel>();
    assert_eq!(inner.namespace(), "outer:inner_model");
    assert_eq!(inner.absolute_namespace(), "modis:outer:inner_model");
}

#[test]
fn test_namespace_can_be_set_explicitly() {
    let (modis, models) = setup();
    {
        let _guard = models.override_namespace("other");
        assert_eq!(models.absolute_namespace(), "modis:other");
        // 覆盖对同一类型的所有句柄立即生效
        assert_eq!(modis.model::<MockModel>().absolute_namespace(), "modis:other");

        let mut model = models.new_record();
        model.try_save().unwrap();
        assert_eq!(model.key().as_deref(), Some("modis:other:1"));
    }
    assert_eq!(models.namespace(), "persistence_spec:mock_model");
}

#[test]
fn test_namespace_reset_to_default() {
    let (_modis, models) = setup();
    models.set_namespace(Some("other"));
    assert_eq!(models.absolute_namespace(), "modis:other");
    models.set_namespace(None::<String>);
    assert_eq!(models.absolute_namespace(), "modis:persistence_spec:mock_model");
}

// 不同 Modis 实例的注册表互不影响
#[test]
fn test_namespace_override_is_per_registry() {
    let (_a, models_a) = setup();
    let (_b, models_b) = setup();
    models_a.set_namespace(Some("other"));
    assert_eq!(models_b.namespace(), "persistence_spec:mock_model");
}

// ---------- key ----------

#[test]
fn test_returns_a_key() {
    let (_modis, models) = setup();
    let mut model = models.new_record();
    model.try_save().unwrap();
    assert_eq!(model.key().as_deref(), Some("modis:persistence_spec:mock_model:1"));
    assert_eq!(model.id(), Some(1));
}

#[test]
fn test_returns_no_key_if_not_saved() {
    let (_modis, models) = setup();
    let model = models.new_record();
    assert!(model.key().is_none());
}

#[test]
fn test_ids_are_sequential() {
    let (_modis, models) = setup();
    let a = models.try_create([("name", "a")]).unwrap();
    let b = models.try_create([("name", "b")]).unwrap();
    assert_eq!(a.id(), Some(1));
    assert_eq!(b.id(), Some(2));
}

// 更新已有记录不会重新分配 ID
#[test]
fn test_update_keeps_key() {
    let (_modis, models) = setup();
    let mut model = models.try_create([("name", "Ian")]).unwrap();
    let key = model.key();
    model.set("name", "Kyle").unwrap();
    model.try_save().unwrap();
    assert_eq!(model.key(), key);

    let found = models.find(1).unwrap();
    assert_eq!(found.get("name"), Some(&json!("Kyle")));
}

// ---------- 脏状态 ----------

#[test]
fn test_dirty_tracking() {
    let (_modis, models) = setup();
    let mut model = models.new_record();
    assert!(model.changed().is_empty());

    model.set("name", "Kyle").unwrap();
    assert_eq!(model.changed(), vec!["name"]);
    assert!(model.attribute_changed("name"));
}

#[test]
fn test_resets_dirty_tracking_when_saved() {
    let (_modis, models) = setup();
    let mut model = models.new_record();
    model.set("name", "Kyle").unwrap();
    assert!(model.attribute_changed("name"));

    model.try_save().unwrap();
    assert!(!model.attribute_changed("name"));
}

#[test]
fn test_resets_dirty_tracking_when_created() {
    let (_modis, models) = setup();
    let model = models.try_create([("name", "Ian")]).unwrap();
    assert!(!model.attribute_changed("name"));

    let model = models.create([("name", "Kyle")]).unwrap();
    assert!(!model.attribute_changed("name"));
    assert!(model.persisted());
}

// 构造时传入的属性相对默认值算作修改
#[test]
fn test_build_marks_supplied_attributes_dirty() {
    let (_modis, models) = setup();
    let model = models.build([("name", "Kyle")]).unwrap();
    assert_eq!(model.changed(), vec!["name"]);
    assert!(model.new_record());
}

#[test]
fn test_is_persisted() {
    let (_modis, models) = setup();
    let mut model = models.new_record();
    assert!(!model.persisted());
    model.try_save().unwrap();
    assert!(model.persisted());
    assert!(!model.new_record());
}

// ---------- 写入失败 ----------

#[test]
fn test_does_not_track_id_if_write_failed() {
    let store = MemoryStore::new();
    let modis = Modis::with_store(Default::default(), Arc::new(store.clone()));
    let models = modis.model::<MockModel>();

    let mut model = models.new_record();
    model.set("name", "Kyle").unwrap();

    store.set_fail_writes(true);
    assert!(!model.save());
    assert!(model.id().is_none());
    assert!(model.key().is_none());
    // 写失败时脏状态保留，after_* 回调不会执行
    assert_eq!(model.changed(), vec!["name"]);
    assert_eq!(
        model.model().called_callbacks,
        vec!["before_save", "before_create"]
    );
    assert!(matches!(model.try_save(), Err(ModisError::RecordNotSaved)));

    store.set_fail_writes(false);
    model.try_save().unwrap();
    assert!(model.key().is_some());
    assert!(model.changed().is_empty());
}

#[test]
fn test_failed_update_keeps_dirty_state() {
    let store = MemoryStore::new();
    let modis = Modis::with_store(Default::default(), Arc::new(store.clone()));
    let models = modis.model::<MockModel>();
    let mut model = models.try_create([("name", "Ian")]).unwrap();

    model.set("name", "Kyle").unwrap();
    store.set_fail_writes(true);
    assert!(!model.save());
    assert_eq!(model.id(), Some(1));
    assert!(model.attribute_changed("name"));
}

// ---------- 回调 ----------

#[test]
fn test_new_record_callbacks() {
    let (_modis, models) = setup();
    let mut model = models.new_record();
    model.try_save().unwrap();
    assert_eq!(
        model.model().called_callbacks,
        vec!["before_save", "before_create", "after_create", "after_save"]
    );
}

#[test]
fn test_existing_record_callbacks() {
    let (_modis, models) = setup();
    let mut model = models.new_record();
    model.try_save().unwrap();
    model.model_mut().called_callbacks.clear();

    model.try_save().unwrap();
    let calls = &model.model().called_callbacks;
    assert_eq!(
        calls,
        &vec!["before_save", "before_update", "after_update", "after_save"]
    );
    assert!(!calls.contains(&"before_create"));
}

#[test]
fn test_invalid_record_runs_no_callbacks() {
    let (_modis, models) = setup();
    let mut model = models.new_record();
    model.set("name", Value::Null).unwrap();
    assert!(!model.save());
    assert!(model.model().called_callbacks.is_empty());
}

// ---------- create! ----------

#[test]
fn test_try_save_raises_if_not_saved() {
    let (_modis, models) = setup();
    let mut model = models.new_record();
    model.set("name", Value::Null).unwrap();

    assert!(matches!(model.try_save(), Err(ModisError::RecordNotSaved)));
    assert!(!model.save());
    assert!(model.key().is_none());
    assert_eq!(model.errors().get("name"), ["can't be blank"]);
}

#[test]
fn test_try_create_raises_if_not_saved() {
    let (_modis, models) = setup();
    let err = models.try_create([("name", "")]).unwrap_err();
    assert!(matches!(err, ModisError::RecordNotSaved));

    // create 不报错，但记录没有被保存
    let model = models.create([("name", "")]).unwrap();
    assert!(!model.persisted());
    assert!(model.key().is_none());
}

#[test]
fn test_create_rejects_unknown_attribute() {
    let (_modis, models) = setup();
    let err = models.create([("nickname", "Ian")]).unwrap_err();
    assert!(matches!(err, ModisError::UnknownAttribute { .. }));
}
