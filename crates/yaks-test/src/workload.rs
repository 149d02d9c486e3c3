//! Workload materializer for one Test generation
//!
//! Builds the ConfigMap holding the test files and the Pod running the test
//! runtime. Output depends only on the Test (spec, name, namespace, uid,
//! TestID) and the controller configuration, so re-applying it during a
//! retried Start converges on identical objects.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, EnvVar, Pod, PodSpec, SecretVolumeSource, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;

use yaks_common::crd::Test;
use yaks_common::kube_utils::controller_owner_ref;
use yaks_common::{LABEL_APP, LABEL_APP_YAKS, LABEL_TEST, LABEL_TEST_ID};

use crate::config::TestControllerConfig;
use crate::error::TestError;
use crate::rbac::VIEWER_NAME;

/// Name of the runtime container
pub const CONTAINER_NAME: &str = "test";
/// Where the ConfigMap is mounted
pub const TESTS_MOUNT_PATH: &str = "/etc/yaks/tests";
/// Where the optional secret is mounted
pub const SECRETS_MOUNT_PATH: &str = "/etc/yaks/secrets";
/// File the runtime writes its JSON results to
pub const TERMINATION_LOG_PATH: &str = "/dev/termination-log";

const TESTS_VOLUME: &str = "tests";
const SECRETS_VOLUME: &str = "secrets";

/// Environment variable names understood by the runtime
pub mod env {
    /// Termination log path
    pub const TERMINATION_LOG: &str = "YAKS_TERMINATION_LOG";
    /// Directory containing the test source and resources
    pub const TESTS_PATH: &str = "YAKS_TESTS_PATH";
    /// Directory containing the mounted secret
    pub const SECRETS_PATH: &str = "YAKS_SECRETS_PATH";
    /// Namespace the test runs in
    pub const NAMESPACE: &str = "YAKS_NAMESPACE";
    /// Name of the Test
    pub const TEST_NAME: &str = "YAKS_TEST_NAME";
    /// TestID of the generation
    pub const TEST_ID: &str = "YAKS_TEST_ID";
    /// Path of the mounted settings file
    pub const SETTINGS_FILE: &str = "YAKS_SETTINGS_FILE";
    /// Inline dependency list
    pub const DEPENDENCIES: &str = "YAKS_DEPENDENCIES";
}

/// ConfigMap and Pod for one generation
#[derive(Clone, Debug, PartialEq)]
pub struct Workload {
    /// Test files
    pub config_map: ConfigMap,
    /// Runtime Pod
    pub pod: Pod,
}

/// Name shared by the Pod and ConfigMap of a generation
pub fn generation_name(test_name: &str, test_id: &str) -> String {
    format!("test-{}-{}", test_name, test_id)
}

/// Labels carried by every object of a generation
pub fn workload_labels(test_name: &str, test_id: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_APP.to_string(), LABEL_APP_YAKS.to_string()),
        (LABEL_TEST.to_string(), test_name.to_string()),
        (LABEL_TEST_ID.to_string(), test_id.to_string()),
    ])
}

/// Parse a `KEY=VALUE` entry
///
/// Both sides are trimmed. Entries that do not split into exactly two
/// non-empty parts yield `None`.
pub fn parse_env_entry(entry: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = entry.split('=').map(str::trim).collect();
    match parts.as_slice() {
        [key, value] if !key.is_empty() && !value.is_empty() => {
            Some((key.to_string(), value.to_string()))
        }
        _ => None,
    }
}

/// Build the workload for the Test's current generation
///
/// Fails on a Test whose files would overwrite each other in the ConfigMap.
pub fn build_workload(test: &Test, config: &TestControllerConfig) -> Result<Workload, TestError> {
    test.validate()?;
    let name = test.name_any();
    let namespace = test.namespace().ok_or(TestError::MissingNamespace)?;
    let test_id = test
        .test_id()
        .ok_or_else(|| TestError::MissingTestId(name.clone()))?;
    let owner = controller_owner_ref(test)?;

    let meta = ObjectMeta {
        name: Some(generation_name(&name, test_id)),
        namespace: Some(namespace.clone()),
        labels: Some(workload_labels(&name, test_id)),
        owner_references: Some(vec![owner]),
        ..Default::default()
    };

    Ok(Workload {
        config_map: build_config_map(test, meta.clone()),
        pod: build_pod(test, &namespace, test_id, meta, config),
    })
}

fn build_config_map(test: &Test, meta: ObjectMeta) -> ConfigMap {
    let spec = &test.spec;
    let mut data = BTreeMap::new();
    data.insert(spec.source.name.clone(), spec.source.content.clone());

    if let Some(settings) = &spec.settings {
        if let Some(file) = settings.file_name() {
            data.insert(file.to_string(), settings.content.clone());
        }
    }

    for resource in &spec.resources {
        data.insert(resource.name.clone(), resource.content.clone());
    }

    ConfigMap {
        metadata: meta,
        data: Some(data),
        ..Default::default()
    }
}

fn build_pod(
    test: &Test,
    namespace: &str,
    test_id: &str,
    meta: ObjectMeta,
    config: &TestControllerConfig,
) -> Pod {
    let config_map_name = meta.name.clone();

    let mut volumes = vec![Volume {
        name: TESTS_VOLUME.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: config_map_name.unwrap_or_default(),
            ..Default::default()
        }),
        ..Default::default()
    }];
    let mut mounts = vec![VolumeMount {
        name: TESTS_VOLUME.to_string(),
        mount_path: TESTS_MOUNT_PATH.to_string(),
        read_only: Some(true),
        ..Default::default()
    }];

    if let Some(secret) = &test.spec.secret {
        volumes.push(Volume {
            name: SECRETS_VOLUME.to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(secret.clone()),
                ..Default::default()
            }),
            ..Default::default()
        });
        mounts.push(VolumeMount {
            name: SECRETS_VOLUME.to_string(),
            mount_path: SECRETS_MOUNT_PATH.to_string(),
            read_only: Some(true),
            ..Default::default()
        });
    }

    let container = Container {
        name: CONTAINER_NAME.to_string(),
        image: Some(config.runtime_image.clone()),
        image_pull_policy: Some("IfNotPresent".to_string()),
        command: Some(config.runtime_command.clone()),
        env: Some(build_env(test, namespace, test_id)),
        volume_mounts: Some(mounts),
        termination_message_path: Some(TERMINATION_LOG_PATH.to_string()),
        termination_message_policy: Some("FallbackToLogsOnError".to_string()),
        ..Default::default()
    };

    Pod {
        metadata: meta,
        spec: Some(PodSpec {
            containers: vec![container],
            restart_policy: Some("Never".to_string()),
            service_account_name: Some(VIEWER_NAME.to_string()),
            volumes: Some(volumes),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Framework variables, then user entries, then the settings variable
fn build_env(test: &Test, namespace: &str, test_id: &str) -> Vec<EnvVar> {
    let mut vars = vec![
        (env::TERMINATION_LOG, TERMINATION_LOG_PATH.to_string()),
        (env::TESTS_PATH, TESTS_MOUNT_PATH.to_string()),
        (env::NAMESPACE, namespace.to_string()),
        (env::TEST_NAME, test.name_any()),
        (env::TEST_ID, test_id.to_string()),
    ]
    .into_iter()
    .map(|(k, v)| env_var(k, v))
    .collect::<Vec<_>>();

    if test.spec.secret.is_some() {
        vars.push(env_var(env::SECRETS_PATH, SECRETS_MOUNT_PATH.to_string()));
    }

    vars.extend(
        test.spec
            .env
            .iter()
            .filter_map(|entry| parse_env_entry(entry))
            .map(|(k, v)| env_var(&k, v)),
    );

    if let Some(settings) = &test.spec.settings {
        match settings.file_name() {
            Some(file) => vars.push(env_var(
                env::SETTINGS_FILE,
                format!("{}/{}", TESTS_MOUNT_PATH, file),
            )),
            None if !settings.content.trim().is_empty() => {
                vars.push(env_var(env::DEPENDENCIES, settings.content.clone()))
            }
            None => {}
        }
    }

    vars
}

fn env_var(name: &str, value: String) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value),
        ..Default::default()
    }
}
