// Devfiles, registry documents and source trees used across tests

use indoc::indoc;
use serde_json::{json, Value};

pub const SPRING_DEVFILE: &str = indoc! {r#"
    schemaVersion: 2.2.0
    metadata:
      name: java-springboot
      language: Java
      projectType: springboot
    components:
      - name: outerloop-build
        image:
          imageName: java-springboot-image:latest
          dockerfile:
            uri: docker/Dockerfile
            buildContext: .
      - name: outerloop-deploy
        attributes:
          deployment/replicas: 1
          deployment/container-port: 8081
          deployment/cpuLimit: "2"
          deployment/memoryLimit: 500Mi
        kubernetes:
          uri: outerloop-deploy.yaml
"#};

/// A devfile without a Kubernetes component.
pub const INNERLOOP_DEVFILE: &str = indoc! {r#"
    schemaVersion: 2.2.0
    metadata:
      name: innerloop-only
    components:
      - name: tools
        container:
          image: quay.io/devfile/universal-developer-image:latest
"#};

pub const NODE_DEVFILE: &str = indoc! {r#"
    schemaVersion: 2.2.0
    metadata:
      name: nodejs
      language: JavaScript
      projectType: Node.js
    components:
      - name: outerloop-deploy
        attributes:
          deployment/container-port: 3000
        kubernetes:
          inlined: |
            kind: Deployment
            apiVersion: apps/v1
"#};

pub const SPRING_SAMPLE: &str = indoc! {r#"
    schemaVersion: 2.2.0
    metadata:
      name: java-springboot-basic
      language: Java
      projectType: springboot
    components:
      - name: image-build
        image:
          imageName: java-springboot-image:latest
          dockerfile:
            uri: docker/Dockerfile
      - name: kubernetes-deploy
        attributes:
          deployment/container-port: 8080
        kubernetes:
          uri: kubernetes/deploy.yaml
"#};

pub const PYTHON_SAMPLE: &str = indoc! {r#"
    schemaVersion: 2.2.0
    metadata:
      name: python-basic
      language: Python
      projectType: Python
    components:
      - name: image-build
        image:
          imageName: python-image:latest
          dockerfile:
            uri: docker/Dockerfile
      - name: kubernetes-deploy
        kubernetes:
          uri: kubernetes/deploy.yaml
"#};

pub const NODE_SAMPLE: &str = indoc! {r#"
    schemaVersion: 2.2.0
    metadata:
      name: nodejs-basic
      language: JavaScript
      projectType: Node.js
    components:
      - name: kubernetes-deploy
        kubernetes:
          uri: kubernetes/deploy.yaml
"#};

pub const POM_XML: &str = indoc! {r#"
    <project>
      <dependencies>
        <dependency>
          <artifactId>spring-boot-starter-web</artifactId>
        </dependency>
      </dependencies>
    </project>
"#};

pub const NODE_SERVER: &str = indoc! {r#"
    const express = require('express');
    const app = express();
    app.listen(8080);
"#};

pub fn registry_index() -> Value {
    json!([
        {"name": "java-springboot-basic", "language": "Java", "projectType": "springboot"},
        {"name": "python-basic", "language": "Python", "projectType": "Python"},
        {"name": "nodejs-basic", "language": "JavaScript", "projectType": "Node.js"}
    ])
}
