use fleet_domain_models::FleetError;
use indexmap::IndexMap;

use crate::document::{ComposeDocument, EnvironmentField, Network, NetworksField, Service};

/// Name of the service injected into every tunneled app's compose graph.
pub const SIDECAR_SERVICE_NAME: &str = "cloudflared";

const SIDECAR_IMAGE: &str = "cloudflare/cloudflared:latest";

/// Parses `content` as a compose document, returning `ComposeInvalid` on
/// malformed YAML or a shape this workspace doesn't understand.
pub fn parse(content: &str) -> Result<ComposeDocument, FleetError> {
    serde_yaml_ng::from_str(content).map_err(|e| FleetError::ComposeInvalid(e.to_string()))
}

/// Re-serializes a document back to YAML.
pub fn serialize(doc: &ComposeDocument) -> Result<String, FleetError> {
    serde_yaml_ng::to_string(doc).map_err(|e| FleetError::ComposeInvalid(e.to_string()))
}

/// Picks the network the sidecar (and every network-less service) should
/// join: the first declared network, or a freshly invented `<app>-net`
/// bridge network if none is declared.
fn target_network(doc: &mut ComposeDocument, app_name: &str) -> String {
    if let Some(name) = doc.networks.keys().next() {
        return name.clone();
    }
    let name = format!("{app_name}-net");
    doc.networks.insert(
        name.clone(),
        Network {
            driver: Some("bridge".to_string()),
            ..Default::default()
        },
    );
    name
}

/// Injects (or re-injects) the tunnel sidecar into `doc`, carrying
/// `tunnel_token`. Every pre-existing service that declares no explicit
/// network is attached to the same network as the sidecar so the tunnel can
/// reach them. Idempotent: calling this twice just overwrites the sidecar's
/// token and leaves every other service untouched.
pub fn inject_sidecar(doc: &mut ComposeDocument, app_name: &str, tunnel_token: &str) {
    let network = target_network(doc, app_name);

    for (name, service) in doc.services.iter_mut() {
        if name == SIDECAR_SERVICE_NAME {
            continue;
        }
        let networks = service.networks.get_or_insert_with(NetworksField::default);
        networks.attach(&network);
    }

    let mut environment = EnvironmentField::Map(IndexMap::new());
    environment.insert("TUNNEL_TOKEN", tunnel_token);

    let mut networks = NetworksField::default();
    networks.attach(&network);

    let mut extra = IndexMap::new();
    extra.insert(
        "command".to_string(),
        serde_yaml_ng::Value::String("tunnel run".to_string()),
    );

    let sidecar = Service {
        image: Some(SIDECAR_IMAGE.to_string()),
        container_name: Some(format!("{app_name}-{SIDECAR_SERVICE_NAME}")),
        environment: Some(environment),
        networks: Some(networks),
        restart: Some("unless-stopped".to_string()),
        extra,
    };

    doc.services.insert(SIDECAR_SERVICE_NAME.to_string(), sidecar);
}

/// Removes the tunnel sidecar service from the document, leaving every
/// other service and network declaration untouched.
pub fn remove_sidecar(doc: &mut ComposeDocument) {
    doc.services.shift_remove(SIDECAR_SERVICE_NAME);
}

/// True if `doc` declares a sidecar service.
pub fn has_sidecar(doc: &ComposeDocument) -> bool {
    doc.services.contains_key(SIDECAR_SERVICE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn injects_sidecar_and_attaches_network_less_service() {
        let content = indoc! {"
            services:
              web:
                image: nginx:latest
        "};
        let mut doc = parse(content).unwrap();
        inject_sidecar(&mut doc, "uptime", "secret-token");

        assert!(has_sidecar(&doc));
        let sidecar = &doc.services[SIDECAR_SERVICE_NAME];
        assert_eq!(sidecar.image.as_deref(), Some(SIDECAR_IMAGE));

        let network_name = doc.networks.keys().next().unwrap().clone();
        assert_eq!(network_name, "uptime-net");

        let web = &doc.services["web"];
        assert!(web.networks.as_ref().unwrap().contains(&network_name));
        assert!(sidecar.networks.as_ref().unwrap().contains(&network_name));
    }

    #[test]
    fn reuses_first_declared_network() {
        let content = indoc! {"
            services:
              web:
                image: nginx:latest
                networks: [frontend]
            networks:
              frontend:
                driver: bridge
        "};
        let mut doc = parse(content).unwrap();
        inject_sidecar(&mut doc, "uptime", "secret-token");
        assert_eq!(doc.networks.len(), 1);
        assert!(doc.networks.contains_key("frontend"));
    }

    #[test]
    fn round_trips_every_preexisting_service() {
        let content = indoc! {"
            services:
              web:
                image: nginx:latest
              db:
                image: postgres:16
                environment:
                  POSTGRES_PASSWORD: hunter2
        "};
        let mut doc = parse(content).unwrap();
        inject_sidecar(&mut doc, "app", "tok");
        let serialized = serialize(&doc).unwrap();
        let reparsed = parse(&serialized).unwrap();

        assert!(reparsed.services.contains_key("web"));
        assert!(reparsed.services.contains_key("db"));
        assert!(reparsed.services.contains_key(SIDECAR_SERVICE_NAME));
        assert_eq!(reparsed.services.len(), 3);
    }

    #[test]
    fn remove_sidecar_is_idempotent() {
        let content = indoc! {"
            services:
              web:
                image: nginx:latest
        "};
        let mut doc = parse(content).unwrap();
        inject_sidecar(&mut doc, "app", "tok");
        remove_sidecar(&mut doc);
        remove_sidecar(&mut doc);
        assert!(!has_sidecar(&doc));
        assert!(doc.services.contains_key("web"));
    }
}
