#![allow(dead_code)]

use chrono::{TimeDelta, TimeZone, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use settingskit::codec::datetime_min;
use settingskit::window::WindowStateSettings;
use settingskit::{
    bind, settings_schema, setting_enum, ChangeListener, Settings, SettingsError, SettingsMap,
    SettingsStore, SettingsStoreExt, StoreViews,
};
use std::str::FromStr;
use std::sync::Arc;

setting_enum! {
    pub enum TimeType {
        Local = 0,
        Remote = 1,
        Utc = 2,
    }
}

settings_schema! {
    pub struct ViewSettings {
        fields {
            indent_size / set_indent_size: i32 = "IndentSize", default 15;
            time_type / set_time_type: TimeType = "TimeType", default TimeType::Remote;
        }
        groups {
            main_window_state: WindowStateSettings = "MainWindowState";
        }
    }
}

settings_schema! {
    /// The demo application's settings.
    pub struct AppSettings {
        fields {
            culture / set_culture: String = "Culture", default "de-DE";
            last_started_app_version / set_last_started_app_version: String = "LastStartedAppVersion";
            is_sound_enabled / set_is_sound_enabled: bool = "IsSoundEnabled", default true;
            test_numbers / set_test_numbers: Vec<i32> = "TestNumbers";
        }
        groups {
            view: ViewSettings = "View";
        }
        lists {
            recently_loaded_files: String = "RecentlyLoadedFiles";
        }
        maps {
            test_map: String = "TestMap";
        }
    }
}

/// Collects every key a listener is called with.
#[derive(Clone, Default)]
pub struct Recorder {
    keys: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn listener(&self) -> ChangeListener {
        let keys = self.keys.clone();
        Arc::new(move |key: &str| keys.lock().push(key.to_string()))
    }

    pub fn keys(&self) -> Vec<String> {
        self.keys.lock().clone()
    }
}

pub fn sample_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap() + TimeDelta::milliseconds(250)
}

pub fn sample_map() -> SettingsMap {
    let mut map = SettingsMap::new();
    map.insert("first", "1");
    map.insert("second", "two");
    map
}

// --- Store scenarios ---

pub fn empty_store_falls_back(store: &Arc<dyn SettingsStore>) {
    assert!(store.keys().unwrap().is_empty());
    assert_eq!(store.get("Missing").unwrap(), None);

    assert!(!store.get_bool("Missing").unwrap());
    assert_eq!(store.get_int("Missing").unwrap(), 0);
    assert_eq!(store.get_long("Missing").unwrap(), 0);
    assert!(store.get_double("Missing").unwrap().is_nan());
    assert_eq!(store.get_decimal("Missing").unwrap(), Decimal::ZERO);
    assert_eq!(store.get_string("Missing").unwrap(), "");
    assert_eq!(store.get_datetime("Missing").unwrap(), datetime_min());
    assert_eq!(store.get_duration("Missing").unwrap(), TimeDelta::zero());
    assert!(store.get_map("Missing").unwrap().is_empty());
    assert!(store.get_string_array("Missing").unwrap().is_empty());
    assert!(store.get_int_array("Missing").unwrap().is_empty());

    assert!(store.get_bool_or("Missing", true).unwrap());
    assert_eq!(store.get_int_or("Missing", 7).unwrap(), 7);
    assert_eq!(store.get_string_or("Missing", "fallback").unwrap(), "fallback");
    assert_eq!(store.get_double_or("Missing", 1.5).unwrap(), 1.5);
}

pub fn set_and_get_every_type(store: &Arc<dyn SettingsStore>) {
    let decimal = Decimal::from_str("12345.678901234567890").unwrap();

    store.put("Types.Bool", true).unwrap();
    store.put("Types.Int", -42i32).unwrap();
    store.put("Types.Long", 1i64 << 40).unwrap();
    store.put("Types.Double", 3.25f64).unwrap();
    store.put("Types.Decimal", decimal).unwrap();
    store.put("Types.String", "hello".to_string()).unwrap();
    store.put("Types.DateTime", sample_time()).unwrap();
    store.put("Types.Duration", TimeDelta::milliseconds(1500)).unwrap();
    store.put("Types.Map", sample_map()).unwrap();
    store
        .put("Arrays.Strings", vec!["a b".to_string(), "c".to_string()])
        .unwrap();
    store.put("Arrays.Ints", vec![1i32, -2, 3]).unwrap();
    store.put("Arrays.Longs", vec![1i64 << 35, 0]).unwrap();
    store.put("Arrays.Doubles", vec![0.5f64, -1.25]).unwrap();
    store.put("Arrays.Decimals", vec![decimal, Decimal::ONE]).unwrap();
    store.put("Arrays.Bools", vec![true, false, true]).unwrap();
    store.put("Arrays.DateTimes", vec![sample_time()]).unwrap();
    store
        .put("Arrays.Durations", vec![TimeDelta::seconds(2), TimeDelta::zero()])
        .unwrap();

    assert!(store.get_bool("Types.Bool").unwrap());
    assert_eq!(store.get_int("Types.Int").unwrap(), -42);
    assert_eq!(store.get_long("Types.Long").unwrap(), 1i64 << 40);
    assert_eq!(store.get_double("Types.Double").unwrap(), 3.25);
    assert_eq!(store.get_decimal("Types.Decimal").unwrap(), decimal);
    assert_eq!(store.get_string("Types.String").unwrap(), "hello");
    assert_eq!(store.get_datetime("Types.DateTime").unwrap(), sample_time());
    assert_eq!(
        store.get_duration("Types.Duration").unwrap(),
        TimeDelta::milliseconds(1500)
    );
    assert_eq!(store.get_map("Types.Map").unwrap(), sample_map());
    assert_eq!(
        store.get_string_array("Arrays.Strings").unwrap(),
        vec!["a b".to_string(), "c".to_string()]
    );
    assert_eq!(store.get_int_array("Arrays.Ints").unwrap(), vec![1, -2, 3]);
    assert_eq!(store.get_long_array("Arrays.Longs").unwrap(), vec![1i64 << 35, 0]);
    assert_eq!(store.get_double_array("Arrays.Doubles").unwrap(), vec![0.5, -1.25]);
    assert_eq!(
        store.get_decimal_array("Arrays.Decimals").unwrap(),
        vec![decimal, Decimal::ONE]
    );
    assert_eq!(
        store.get_bool_array("Arrays.Bools").unwrap(),
        vec![true, false, true]
    );
    assert_eq!(
        store.get_datetime_array("Arrays.DateTimes").unwrap(),
        vec![sample_time()]
    );
    assert_eq!(
        store.get_duration_array("Arrays.Durations").unwrap(),
        vec![TimeDelta::seconds(2), TimeDelta::zero()]
    );

    let keys = store.keys().unwrap();
    assert_eq!(keys.len(), 17);
    assert_eq!(keys[0], "Arrays.Bools");
    assert!(keys.contains(&"Types.Map".to_string()));
}

pub fn nan_survives(store: &Arc<dyn SettingsStore>) {
    store.put("Value", f64::NAN).unwrap();
    assert!(store.get_double_or("Value", 1.0).unwrap().is_nan());
}

pub fn mismatched_type_falls_back(store: &Arc<dyn SettingsStore>) {
    store.put("Text", "not a number".to_string()).unwrap();
    assert_eq!(store.get_int_or("Text", 7).unwrap(), 7);
    assert_eq!(
        store.get_datetime_or("Text", sample_time()).unwrap(),
        sample_time()
    );
}

pub fn set_none_removes(store: &Arc<dyn SettingsStore>) {
    store.put("A.B", 1).unwrap();
    store.set("A.B", None).unwrap();
    assert!(!store.contains("A.B").unwrap());
    assert!(!store.remove("A.B").unwrap());
}

pub fn rename_moves_value(store: &Arc<dyn SettingsStore>) {
    let recorder = Recorder::default();
    store.put("Old.Name", 5).unwrap();
    store.subscribe(recorder.listener());

    assert!(store.rename("Old.Name", "New.Other.Name").unwrap());
    assert_eq!(store.get_int("New.Other.Name").unwrap(), 5);
    assert!(!store.contains("Old.Name").unwrap());
    assert!(recorder.keys().contains(&"Old.Name".to_string()));
    assert!(recorder.keys().contains(&"New.Other.Name".to_string()));

    assert!(!store.rename("Old.Name", "Anything").unwrap());
}

pub fn rename_changing_only_case(store: &Arc<dyn SettingsStore>) {
    store.put("Flag", 5).unwrap();

    assert!(store.rename("Flag", "FLAG").unwrap());
    assert_eq!(store.get_int("FLAG").unwrap(), 5);
    assert_eq!(store.keys().unwrap(), vec!["FLAG".to_string()]);
}

pub fn rename_into_and_out_of_own_path(store: &Arc<dyn SettingsStore>) {
    store.put("Tree.Leaf", 1).unwrap();

    assert!(store.rename("Tree.Leaf", "Tree.Leaf.Child").unwrap());
    assert_eq!(store.get_int("Tree.Leaf.Child").unwrap(), 1);
    assert_eq!(store.keys().unwrap(), vec!["Tree.Leaf.Child".to_string()]);

    assert!(store.rename("Tree.Leaf.Child", "Tree.Leaf").unwrap());
    assert_eq!(store.get_int("Tree.Leaf").unwrap(), 1);
    assert_eq!(store.keys().unwrap(), vec!["Tree.Leaf".to_string()]);
}

pub fn notifies_on_change(store: &Arc<dyn SettingsStore>) {
    let recorder = Recorder::default();
    let id = store.subscribe(recorder.listener());

    store.put("A", 1).unwrap();
    store.remove("A").unwrap();
    assert_eq!(recorder.keys(), vec!["A".to_string(), "A".to_string()]);

    assert!(store.unsubscribe(id));
    store.put("B", 1).unwrap();
    assert_eq!(recorder.keys().len(), 2);
}

pub fn remove_pattern(store: &Arc<dyn SettingsStore>) {
    store.put("Plugins.One.Enabled", true).unwrap();
    store.put("Plugins.Two.Name", "two".to_string()).unwrap();
    store.put("Other", 1).unwrap();

    assert!(store.remove_matching(r"^Plugins\.").unwrap());
    assert_eq!(store.keys().unwrap(), vec!["Other".to_string()]);
    assert!(!store.remove_matching(r"^Plugins\.").unwrap());
    assert!(matches!(
        store.remove_matching("("),
        Err(SettingsError::InvalidPattern(_))
    ));
}

pub fn disposed_store_fails(store: &Arc<dyn SettingsStore>) {
    store.put("A", 1).unwrap();
    store.dispose().unwrap();
    store.dispose().unwrap();

    assert!(store.is_disposed());
    assert!(matches!(store.get("A"), Err(SettingsError::Disposed)));
    assert!(matches!(store.get_int_or("A", 3), Err(SettingsError::Disposed)));
    assert!(matches!(store.put("A", 2), Err(SettingsError::Disposed)));
}

// --- Adapter scenarios ---

pub fn adapter_defaults(store: &Arc<dyn SettingsStore>) {
    let settings: AppSettings = bind(store.clone(), "").unwrap();

    assert_eq!(settings.culture(), "de-DE");
    assert_eq!(settings.last_started_app_version(), "");
    assert!(settings.is_sound_enabled());
    assert!(settings.test_numbers().is_empty());
    assert_eq!(settings.view().indent_size(), 15);
    assert_eq!(settings.view().time_type(), TimeType::Remote);
    assert_eq!(settings.view().main_window_state().bounds(), None);
    assert!(settings.recently_loaded_files().is_empty().unwrap());
    assert!(store.keys().unwrap().is_empty());
}

pub fn adapter_writes_through(store: &Arc<dyn SettingsStore>) {
    let settings: AppSettings = bind(store.clone(), "").unwrap();

    settings.set_culture("en-US").unwrap();
    settings.set_test_numbers(vec![3, 1, 2]).unwrap();
    settings.view().set_indent_size(4).unwrap();
    settings.view().set_time_type(TimeType::Utc).unwrap();
    settings
        .view()
        .main_window_state()
        .set_width(1024)
        .unwrap();

    assert_eq!(store.get_string("Culture").unwrap(), "en-US");
    assert_eq!(store.get_int_array("TestNumbers").unwrap(), vec![3, 1, 2]);
    assert_eq!(store.get_int("View.IndentSize").unwrap(), 4);
    assert_eq!(store.get_long("View.TimeType").unwrap(), 2);
    assert_eq!(store.get_int("View.MainWindowState.Width").unwrap(), 1024);

    assert_eq!(settings.culture(), "en-US");
    assert_eq!(settings.view().time_type(), TimeType::Utc);
}

pub fn adapter_notifies_relative_keys(store: &Arc<dyn SettingsStore>) {
    let settings: AppSettings = bind(store.clone(), "").unwrap();
    let root = Recorder::default();
    let view = Recorder::default();
    settings.subscribe(root.listener());
    settings.view().subscribe(view.listener());

    settings.view().set_indent_size(20).unwrap();
    assert_eq!(root.keys(), vec!["View.IndentSize".to_string()]);
    assert_eq!(view.keys(), vec!["IndentSize".to_string()]);

    // equal value: no write, no notification
    settings.view().set_indent_size(20).unwrap();
    assert_eq!(root.keys().len(), 1);

    settings.set_culture("fr-FR").unwrap();
    assert_eq!(root.keys().len(), 2);
    assert_eq!(view.keys().len(), 1);
}

pub fn adapter_collections(store: &Arc<dyn SettingsStore>) {
    let settings: AppSettings = bind(store.clone(), "").unwrap();

    let files = settings.recently_loaded_files();
    files.push("a.txt".to_string()).unwrap();
    files.push("b.txt".to_string()).unwrap();
    files.insert(0, "first.txt".to_string()).unwrap();
    assert_eq!(
        store.get_string_array("RecentlyLoadedFiles").unwrap(),
        vec!["first.txt", "a.txt", "b.txt"]
    );
    assert!(files.remove(&"a.txt".to_string()).unwrap());
    assert_eq!(settings.recently_loaded_files().len().unwrap(), 2);
    assert!(files.remove_at(5).is_err());

    let map = settings.test_map();
    assert_eq!(map.insert("key", "value".to_string()).unwrap(), None);
    assert_eq!(
        map.insert("key", "other".to_string()).unwrap(),
        Some("value".to_string())
    );
    assert_eq!(store.get_map("TestMap").unwrap().get("key"), Some("other"));
    assert!(map.remove("key").unwrap());
    assert!(map.is_empty().unwrap());
}

pub fn collections_keep_unreadable_values(store: &Arc<dyn SettingsStore>) {
    let odd = vec!["a".to_string(), "1".to_string(), "b".to_string()];
    store.put("Odd", odd.clone()).unwrap();
    store.put("Numbers", "1,x,3".to_string()).unwrap();
    store.put("Count", 5).unwrap();

    let map = store.map::<String>("Odd");
    assert!(map.is_empty().unwrap());
    assert!(matches!(
        map.insert("c", "3".to_string()),
        Err(SettingsError::MalformedStoredValue { .. })
    ));
    assert_eq!(store.get_string_array("Odd").unwrap(), odd);

    let numbers = store.list::<i32>("Numbers");
    assert!(matches!(
        numbers.push(4),
        Err(SettingsError::MalformedStoredValue { .. })
    ));
    assert_eq!(store.get_string("Numbers").unwrap(), "1,x,3");

    let names = store.list::<String>("Count");
    assert!(names.to_vec().unwrap().is_empty());
    assert!(matches!(
        names.push("x".to_string()),
        Err(SettingsError::MalformedStoredValue { .. })
    ));
    assert_eq!(store.get_int("Count").unwrap(), 5);
}

pub fn adapter_with_prefix(store: &Arc<dyn SettingsStore>) {
    let plugin: ViewSettings = bind(store.clone(), "Plugins.Mine").unwrap();
    plugin.set_indent_size(3).unwrap();

    assert_eq!(store.get_int("Plugins.Mine.IndentSize").unwrap(), 3);
    assert!(!store.contains("IndentSize").unwrap());
    assert!(Arc::ptr_eq(plugin.settings_store(), store));
}

pub fn adapter_ignores_wrong_types(store: &Arc<dyn SettingsStore>) {
    store.put("View.IndentSize", "wide".to_string()).unwrap();
    store.put("View.TimeType", 99).unwrap();

    let settings: AppSettings = bind(store.clone(), "").unwrap();
    assert_eq!(settings.view().indent_size(), 15);
    assert_eq!(settings.view().time_type(), TimeType::Remote);
}
