#![forbid(unsafe_code)]

//! End-to-end use of the facade: a settings model bound to two views.

use tether::prelude::*;
use tracing_test::traced_test;

fn settings_class() -> std::rc::Rc<ObjectClass> {
    ObjectClass::builder("Settings")
        .property(PropertyDescriptor::new("volume", ValueType::F64))
        .property(PropertyDescriptor::new("muted", ValueType::Bool))
        .build()
        .unwrap()
}

fn slider_class() -> std::rc::Rc<ObjectClass> {
    ObjectClass::builder("Slider")
        .property(PropertyDescriptor::new("value", ValueType::I32).constraint(
            tether::Constraint::IntRange { min: 0, max: 100 },
        ))
        .property(PropertyDescriptor::new("sensitive", ValueType::Bool))
        .build()
        .unwrap()
}

#[test]
#[traced_test]
fn settings_drive_views_until_scope_ends() {
    let settings = Object::new(&settings_class());
    let slider = Object::new(&slider_class());

    {
        let mut scope = BindingScope::new();
        scope.hold(
            BindingBuilder::new(&settings, "volume", &slider, "value")
                .bidirectional()
                .transform_to(|v, _| Ok(Value::F64(v.as_f64().unwrap_or(0.0) * 100.0)))
                .transform_from(|v, _| Ok(Value::F64(v.as_f64().unwrap_or(0.0) / 100.0)))
                .build()
                .unwrap(),
        );
        scope
            .bind(&settings, "muted", &slider, "sensitive", BindingFlags::DEFAULT)
            .unwrap();

        settings.set("volume", 0.5).unwrap();
        assert_eq!(slider.get("value").unwrap(), Value::I32(50));

        slider.set("value", 25).unwrap();
        assert_eq!(settings.get("volume").unwrap(), Value::F64(0.25));

        settings.set("muted", true).unwrap();
        assert_eq!(slider.get("sensitive").unwrap(), Value::Bool(true));
        assert_eq!(binding_count(&settings), 2);
    }

    assert_eq!(binding_count(&settings), 0);
    settings.set("volume", 0.9).unwrap();
    assert_eq!(slider.get("value").unwrap(), Value::I32(25));
    assert!(logs_contain("binding created"));
    assert!(logs_contain("unbind requested"));
}

#[cfg(feature = "auth")]
#[test]
fn auth_is_reexported() {
    let observer = tether::auth::AuthObserver::new();
    struct Peer;
    impl tether::auth::PeerStream for Peer {
        fn peer_label(&self) -> String {
            "peer".into()
        }
    }
    assert!(observer.authorize_authenticated_peer(&Peer, None));
}
