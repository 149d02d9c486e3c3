//! Viewer identity for test Pods
//!
//! Every namespace that runs tests gets a `yaks-viewer` ServiceAccount bound
//! to a read-only Role, so steps inside a test can inspect the workloads
//! they exercise. The objects are shared by all Tests in the namespace and
//! carry no owner references.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{PolicyRule, Role, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use yaks_common::{LABEL_APP, LABEL_APP_YAKS};

/// Name shared by the ServiceAccount, Role and RoleBinding
pub const VIEWER_NAME: &str = "yaks-viewer";

const READ_VERBS: [&str; 3] = ["get", "list", "watch"];

/// ServiceAccount, Role and RoleBinding for one namespace
#[derive(Clone, Debug, PartialEq)]
pub struct ViewerRbac {
    /// Identity the test Pod runs as
    pub service_account: ServiceAccount,
    /// Read-only permissions
    pub role: Role,
    /// Binds the Role to the ServiceAccount
    pub role_binding: RoleBinding,
}

/// Build the viewer RBAC objects for `namespace`
pub fn viewer_rbac(namespace: &str) -> ViewerRbac {
    ViewerRbac {
        service_account: ServiceAccount {
            metadata: metadata(namespace),
            ..Default::default()
        },
        role: Role {
            metadata: metadata(namespace),
            rules: Some(viewer_rules()),
        },
        role_binding: RoleBinding {
            metadata: metadata(namespace),
            role_ref: RoleRef {
                api_group: "rbac.authorization.k8s.io".to_string(),
                kind: "Role".to_string(),
                name: VIEWER_NAME.to_string(),
            },
            subjects: Some(vec![Subject {
                kind: "ServiceAccount".to_string(),
                name: VIEWER_NAME.to_string(),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            }]),
        },
    }
}

fn metadata(namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(VIEWER_NAME.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(BTreeMap::from([(
            LABEL_APP.to_string(),
            LABEL_APP_YAKS.to_string(),
        )])),
        ..Default::default()
    }
}

fn viewer_rules() -> Vec<PolicyRule> {
    vec![
        // Core resources
        read_rule(
            "",
            &[
                "pods",
                "pods/log",
                "services",
                "endpoints",
                "configmaps",
                "persistentvolumeclaims",
                "events",
            ],
        ),
        // Apps resources
        read_rule("apps", &["deployments", "replicasets", "statefulsets"]),
        // Other tests
        read_rule("yaks.citrusframework.org", &["tests"]),
    ]
}

fn read_rule(api_group: &str, resources: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(vec![api_group.to_string()]),
        resources: Some(resources.iter().map(|r| r.to_string()).collect()),
        verbs: READ_VERBS.iter().map(|v| v.to_string()).collect(),
        ..Default::default()
    }
}
