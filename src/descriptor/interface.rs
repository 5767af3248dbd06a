use std::collections::BTreeMap;

use log::debug;

use super::{Annotations, Method, Property, Signal};

/// A named DBus interface and its members.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Interface {
    name: String,
    methods: BTreeMap<String, Method>,
    signals: BTreeMap<String, Signal>,
    properties: BTreeMap<String, Property>,
    annotations: Annotations,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Interface {
            name: name.into(),
            ..Interface::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The interface name usable as a Rust identifier,
    /// e.g. `org_freedesktop_DBus`.
    pub fn mangled_name(&self) -> String {
        self.name.replace('.', "_")
    }

    /// Adds a method, claiming it for this interface. A method of the same
    /// name is replaced and returned.
    pub fn add_method(&mut self, mut method: Method) -> Option<Method> {
        debug!("interface {}: adding method {}", self.name, method.name());
        method.set_interface(&self.name);
        self.methods.insert(method.name().to_owned(), method)
    }

    pub fn add_signal(&mut self, mut signal: Signal) -> Option<Signal> {
        debug!("interface {}: adding signal {}", self.name, signal.name());
        signal.set_interface(&self.name);
        self.signals.insert(signal.name().to_owned(), signal)
    }

    pub fn add_property(&mut self, mut property: Property) -> Option<Property> {
        debug!("interface {}: adding property {}", self.name, property.name());
        property.set_interface(&self.name);
        self.properties.insert(property.name().to_owned(), property)
    }

    pub fn remove_signal(&mut self, name: &str) -> Option<Signal> {
        self.signals.remove(name)
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    /// Looks a method up by its snake_case native name.
    pub fn method_by_native_name(&self, native_name: &str) -> Option<&Method> {
        self.methods
            .values()
            .find(|method| method.native_name() == native_name)
    }

    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.get(name)
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.values()
    }

    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.signals.values()
    }

    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.values()
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations.insert(key.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::Interface;
    use crate::boxing::NativeType;
    use crate::descriptor::{Access, Method, Property, Signal};
    use crate::error::Result;
    use test_log::test;

    #[test]
    fn members() -> Result<()> {
        let mut iface = Interface::new("org.freedesktop.DBus");
        assert_eq!(iface.mangled_name(), "org_freedesktop_DBus");

        assert!(iface
            .add_method(Method::from_signatures("GetNameOwner", "s", "s")?)
            .is_none());
        assert!(iface.add_method(Method::new("Hello")).is_none());
        assert!(iface.add_method(Method::new("Hello")).is_some());
        iface.add_signal(Signal::from_signature("NameLost", "s")?);

        let method = iface.method("GetNameOwner").expect("method");
        assert_eq!(method.interface(), Some("org.freedesktop.DBus"));
        assert_eq!(
            iface.method_by_native_name("get_name_owner").map(Method::name),
            Some("GetNameOwner")
        );
        assert_eq!(iface.methods().count(), 2);
        assert_eq!(
            iface.signal("NameLost").and_then(Signal::interface),
            Some("org.freedesktop.DBus")
        );

        assert!(iface.remove_signal("NameLost").is_some());
        assert!(iface.signal("NameLost").is_none());
        assert_eq!(iface.signals().count(), 0);
        Ok(())
    }

    #[test]
    fn properties() -> Result<()> {
        let mut iface = Interface::new("org.freedesktop.DBus");
        let features = Property::from_signature("Features", "as", Access::Read)?;
        assert!(iface.add_property(features).is_none());
        let interfaces = Property::from_native_type(
            "Interfaces",
            &NativeType::Array(Box::new(NativeType::Str)),
            Access::Read,
        )?;
        iface.add_property(interfaces);

        let property = iface.property("Interfaces").expect("property");
        assert_eq!(property.signature(), "as");
        assert_eq!(property.interface(), Some("org.freedesktop.DBus"));
        assert_eq!(
            iface.properties().map(Property::name).collect::<Vec<_>>(),
            vec!["Features", "Interfaces"]
        );

        let replacement = Property::from_signature("Features", "as", Access::ReadWrite)?;
        let replaced = iface.add_property(replacement).expect("replaced property");
        assert_eq!(replaced.access(), Access::Read);
        assert_eq!(iface.properties().count(), 2);
        Ok(())
    }
}
