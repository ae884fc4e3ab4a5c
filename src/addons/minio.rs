//! MinIO object storage, as typed Kubernetes objects

use crate::config::MinioSettings;
use crate::error::Result;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EmptyDirVolumeSource, EnvVar, Namespace, PodSpec, PodTemplateSpec,
    Service, ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

pub const API_PORT: i32 = 9000;
pub const CONSOLE_PORT: i32 = 9001;

fn labels() -> BTreeMap<String, String> {
    [("app".to_string(), "minio".to_string())].into()
}

fn meta(name: &str, namespace: Option<&str>) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        labels: Some(labels()),
        ..Default::default()
    }
}

pub fn namespace(settings: &MinioSettings) -> Namespace {
    Namespace {
        metadata: meta(&settings.namespace, None),
        ..Default::default()
    }
}

/// Single-replica MinIO server backed by an emptyDir
pub fn deployment(settings: &MinioSettings) -> Deployment {
    let env = |name: &str, value: &str| EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    };
    let port = |name: &str, port: i32| ContainerPort {
        name: Some(name.to_string()),
        container_port: port,
        ..Default::default()
    };

    Deployment {
        metadata: meta("minio", Some(&settings.namespace)),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: "minio".to_string(),
                        image: Some(settings.image.clone()),
                        args: Some(vec![
                            "server".to_string(),
                            "/data".to_string(),
                            "--console-address".to_string(),
                            format!(":{}", CONSOLE_PORT),
                        ]),
                        env: Some(vec![
                            env("MINIO_ROOT_USER", &settings.root_user),
                            env("MINIO_ROOT_PASSWORD", &settings.root_password),
                        ]),
                        ports: Some(vec![port("api", API_PORT), port("console", CONSOLE_PORT)]),
                        volume_mounts: Some(vec![VolumeMount {
                            name: "data".to_string(),
                            mount_path: "/data".to_string(),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    volumes: Some(vec![Volume {
                        name: "data".to_string(),
                        empty_dir: Some(EmptyDirVolumeSource::default()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// LoadBalancer service; gets an address once MetalLB is running
pub fn service(settings: &MinioSettings) -> Service {
    let port = |name: &str, port: i32| ServicePort {
        name: Some(name.to_string()),
        port,
        target_port: Some(IntOrString::Int(port)),
        ..Default::default()
    };

    Service {
        metadata: meta("minio", Some(&settings.namespace)),
        spec: Some(ServiceSpec {
            type_: Some("LoadBalancer".to_string()),
            selector: Some(labels()),
            ports: Some(vec![port("api", API_PORT), port("console", CONSOLE_PORT)]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// All MinIO objects as one multi-document YAML stream
pub fn manifest(settings: &MinioSettings) -> Result<String> {
    let docs = [
        serde_yaml::to_string(&namespace(settings))?,
        serde_yaml::to_string(&deployment(settings))?,
        serde_yaml::to_string(&service(settings))?,
    ];
    Ok(docs.join("---\n"))
}
