//! AWS CDK (Python) code generation from the ordered element sequence.

use tracing::debug;

use crate::config::CompilerConfig;
use crate::element::{
    BucketElement, ComputeElement, DatabaseElement, Element, ElementRef, SecurityGroupRule,
    VpcElement,
};
use crate::writer::FileWriter;

/// Imports every generated script starts with.
const BOILERPLATE_IMPORTS: [&str; 3] = [
    "import aws_cdk as cdk",
    "from aws_cdk import Stack",
    "from constructs import Construct",
];

/// CDK library modules an element may need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CdkModule {
    Ec2,
    Iam,
    Rds,
    S3,
    S3Assets,
    S3Deployment,
}

impl CdkModule {
    pub fn import_line(&self) -> &'static str {
        match self {
            CdkModule::Ec2 => "from aws_cdk import aws_ec2 as ec2",
            CdkModule::Iam => "from aws_cdk import aws_iam as iam",
            CdkModule::Rds => "from aws_cdk import aws_rds as rds",
            CdkModule::S3 => "from aws_cdk import aws_s3 as s3",
            CdkModule::S3Assets => "from aws_cdk import aws_s3_assets as s3assets",
            CdkModule::S3Deployment => "from aws_cdk import aws_s3_deployment as s3_deployment",
        }
    }
}

/// Deduplicated set of required modules, kept in first-insertion order so
/// output is deterministic.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSet {
    modules: Vec<CdkModule>,
}

impl ImportSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: CdkModule) {
        if !self.modules.contains(&module) {
            self.modules.push(module);
        }
    }

    #[cfg(test)]
    pub fn contains(&self, module: CdkModule) -> bool {
        self.modules.contains(&module)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Import statements: the boilerplate first, then each module once.
    pub fn lines(&self) -> impl Iterator<Item = &'static str> + '_ {
        BOILERPLATE_IMPORTS
            .into_iter()
            .chain(self.modules.iter().map(CdkModule::import_line))
    }
}

/// Human-readable label for a well-known port.
pub fn port_description(port: u16) -> &'static str {
    match port {
        22 => "SSH",
        80 => "Web Server",
        3306 => "MySQL",
        5432 => "Postgres",
        _ => "Unknown",
    }
}

impl Element {
    /// Register the modules this element's declarations use.
    pub fn emit_imports(&self, imports: &mut ImportSet) {
        match self {
            Element::Vpc(_) => imports.insert(CdkModule::Ec2),
            Element::Compute(compute) => {
                imports.insert(CdkModule::Ec2);
                imports.insert(CdkModule::Iam);
                if compute.app_path.is_some() {
                    imports.insert(CdkModule::S3Assets);
                }
            }
            Element::Database(_) => {
                imports.insert(CdkModule::Ec2);
                imports.insert(CdkModule::Rds);
            }
            Element::Bucket(bucket) => {
                imports.insert(CdkModule::S3);
                if bucket.app_path.is_some() {
                    imports.insert(CdkModule::S3Deployment);
                }
            }
            Element::SecurityGroupRule(_) => imports.insert(CdkModule::Ec2),
        }
    }

    /// Append this element's declarations to the script.
    pub fn emit_source(&self, writer: &mut FileWriter) {
        match self {
            Element::Vpc(vpc) => emit_vpc(vpc, writer),
            Element::Compute(compute) => emit_compute(compute, writer),
            Element::Database(database) => emit_database(database, writer),
            Element::Bucket(bucket) => emit_bucket(bucket, writer),
            Element::SecurityGroupRule(rule) => emit_rule(rule, writer),
        }
    }
}

fn emit_vpc(vpc: &VpcElement, writer: &mut FileWriter) {
    writer.append_line(format!(
        "{} = ec2.Vpc(self, '{}', nat_gateways=1)",
        vpc.variable_name, vpc.resource_name
    ));
}

fn emit_security_group(variable_name: &str, resource_name: &str, vpc: &ElementRef, writer: &mut FileWriter) {
    writer.append_line(format!(
        "{}_sg = ec2.SecurityGroup(self, '{}-SecurityGroup', vpc={})",
        variable_name, resource_name, vpc.variable_name
    ));
}

fn emit_compute(compute: &ComputeElement, writer: &mut FileWriter) {
    let var = &compute.variable_name;
    let role = format!("{}_role", var);

    emit_security_group(var, &compute.resource_name, &compute.vpc, writer);

    writer.append_line(format!(
        "{}=iam.Role(self, '{} Role', assumed_by=iam.ServicePrincipal('ec2.amazonaws.com'))",
        role, compute.resource_name
    ));
    writer.append_line(format!(
        "{}.add_managed_policy(iam.ManagedPolicy.from_aws_managed_policy_name('AmazonSSMManagedInstanceCore'))",
        role
    ));

    let machine_image = match &compute.ami_id {
        Some(ami) => format!(
            "ec2.MachineImage.generic_linux({{\"{}\": \"{}\"}})",
            compute.availability_zone, ami
        ),
        None => "ec2.AmazonLinuxImage(generation=ec2.AmazonLinuxGeneration.AMAZON_LINUX_2)".to_string(),
    };
    let subnet = if compute.is_public {
        "PUBLIC"
    } else {
        "PRIVATE_WITH_EGRESS"
    };

    writer.append_line(format!("{} = ec2.Instance(self, '{}',", var, compute.resource_name));
    writer.increase_indent();
    writer.append_line(format!("instance_type=ec2.InstanceType('{}'),", compute.instance_type));
    writer.append_line(format!("machine_image={},", machine_image));
    writer.append_line(format!(
        "vpc_subnets=ec2.SubnetSelection(subnet_type=ec2.SubnetType.{}),",
        subnet
    ));
    writer.append_line(format!("vpc={},", compute.vpc.variable_name));
    writer.append_line(format!("security_group={}_sg,", var));
    writer.append_line(format!("role={}", role));
    writer.decrease_indent();
    writer.append_line(")");

    if let Some(app_path) = &compute.app_path {
        let asset = format!("{}_asset", var);
        let file_path = format!("{}_filepath", var);
        writer.append_line(format!(
            "{}=s3assets.Asset(self, '{} Asset', path='{}')",
            asset, compute.resource_name, app_path
        ));
        writer.append_line(format!("{}.grant_read({})", asset, role));
        writer.append_line(format!(
            "{}={}.user_data.add_s3_download_command(bucket={}.bucket, bucket_key={}.s3_object_key)",
            file_path, var, asset, asset
        ));
        writer.append_line(format!("{}.user_data.add_commands(f'cp {{{}}} app.zip')", var, file_path));
        writer.append_line(format!("{}.user_data.add_commands('unzip app.zip')", var));
    }

    if let Some(user_data) = &compute.user_data {
        writer.append_line(format!("{}.add_user_data('{}')", var, user_data));
    }

    if compute.is_public {
        writer.append_line(format!(
            "cdk.CfnOutput(self, '{} IP Address', value={}.instance_public_ip)",
            compute.resource_name, var
        ));
    }
}

fn emit_database(database: &DatabaseElement, writer: &mut FileWriter) {
    let var = &database.variable_name;

    emit_security_group(var, &database.resource_name, &database.vpc, writer);

    writer.append_line(format!(
        "{} = rds.DatabaseInstance(self, '{}',",
        var, database.resource_name
    ));
    writer.increase_indent();
    writer.append_line(format!("instance_type=ec2.InstanceType('{}'),", database.instance_type));
    writer.append_line(format!(
        "engine=rds.DatabaseInstanceEngine.{},",
        database.engine.as_str().to_uppercase()
    ));
    writer.append_line(format!("vpc={},", database.vpc.variable_name));
    writer.append_line(format!("security_groups=[{}_sg],", var));
    if database.is_public {
        writer.append_line("vpc_subnets=ec2.SubnetSelection(subnet_type=ec2.SubnetType.PUBLIC),");
    }
    writer.append_line(format!(
        "credentials=rds.Credentials.from_generated_secret('{}_user'),",
        database.engine
    ));
    writer.append_line(format!("database_name='{}',", database.database_name));
    writer.append_line("allocated_storage=10,");
    writer.append_line("multi_az=False");
    writer.decrease_indent();
    writer.append_line(")");
}

fn emit_bucket(bucket: &BucketElement, writer: &mut FileWriter) {
    let var = &bucket.variable_name;

    writer.append_line(format!("{} = s3.Bucket(self, '{}',", var, bucket.resource_name));
    writer.increase_indent();
    writer.append_line("auto_delete_objects=True,");
    match &bucket.website {
        Some(documents) => {
            writer.append_line("public_read_access=True,");
            writer.append_line(format!("website_index_document='{}',", documents.index));
            writer.append_line(format!("website_error_document='{}',", documents.error));
        }
        None => writer.append_line("public_read_access=False,"),
    }
    writer.append_line("removal_policy=cdk.RemovalPolicy.DESTROY");
    writer.decrease_indent();
    writer.append_line(")");

    if let Some(app_path) = &bucket.app_path {
        writer.append_line(format!(
            "s3_deployment.BucketDeployment(self, '{} Deployment',",
            bucket.resource_name
        ));
        writer.increase_indent();
        writer.append_line(format!("sources=[s3_deployment.Source.asset('{}')],", app_path));
        writer.append_line(format!("destination_bucket={}", var));
        writer.decrease_indent();
        writer.append_line(")");
    }
}

fn emit_rule(rule: &SecurityGroupRule, writer: &mut FileWriter) {
    match rule.boundary_endpoint() {
        Some(endpoint) => {
            for &port in &rule.ports {
                writer.append_line(format!(
                    "{}.add_ingress_rule(ec2.Peer.any_ipv4(), ec2.Port.{}({}), '{}')",
                    endpoint.security_group_variable(),
                    rule.protocol,
                    port,
                    port_description(port)
                ));
            }
        }
        None => {
            for &port in &rule.ports {
                writer.append_line(format!(
                    "{}.connections.allow_from(ec2.Connections(security_groups=[{}]), ec2.Port.{}({}), '{}')",
                    rule.source.security_group_variable(),
                    rule.target.security_group_variable(),
                    rule.protocol,
                    port,
                    port_description(port)
                ));
            }
        }
    }
}

/// Turns an ordered element sequence into the final script.
pub struct CodeGenerator<'a> {
    config: &'a CompilerConfig,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(config: &'a CompilerConfig) -> Self {
        Self { config }
    }

    /// Generate the script for a diagram from its elements.
    pub fn generate(&self, diagram_name: &str, elements: &[Element]) -> String {
        let mut imports = ImportSet::new();
        for element in elements {
            element.emit_imports(&mut imports);
        }

        let mut writer = FileWriter::new();
        for line in imports.lines() {
            writer.append_line(line);
        }

        let stack_class = &self.config.stack_class;
        writer.append_line(format!("class {}(Stack):", stack_class));
        writer.increase_indent();
        writer.append_line(
            "def __init__(self, scope: Construct, construct_id: str, **kwargs) -> None:",
        );
        writer.increase_indent();
        writer.append_line("super().__init__(scope, construct_id, **kwargs)");

        for element in elements {
            debug!("Generating source for {:?} {}", element.kind(), element.id());
            element.emit_source(&mut writer);
        }

        writer.decrease_indent();
        writer.decrease_indent();
        writer.append_line("app = cdk.App()");
        writer.append_line(format!("{}(app, '{}')", stack_class, diagram_name));
        writer.append_line("app.synth()");

        writer.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{DatabaseEngine, ElementKind, WebsiteDocuments};
    use crate::writer::LINE_ENDING;

    fn lines(writer: FileWriter) -> Vec<String> {
        writer
            .into_text()
            .split(LINE_ENDING)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn vpc_ref() -> ElementRef {
        ElementRef {
            id: "v".to_string(),
            variable_name: "a1".to_string(),
            resource_name: "VPC1".to_string(),
            kind: ElementKind::Vpc,
        }
    }

    fn compute_ref(id: &str, var: &str) -> ElementRef {
        ElementRef {
            id: id.to_string(),
            variable_name: var.to_string(),
            resource_name: format!("{}1", id),
            kind: ElementKind::Compute,
        }
    }

    fn compute() -> ComputeElement {
        ComputeElement {
            id: "w".to_string(),
            variable_name: "a2".to_string(),
            resource_name: "web1".to_string(),
            vpc: vpc_ref(),
            instance_type: "t3.nano".to_string(),
            ami_id: None,
            availability_zone: "us-east-1".to_string(),
            is_public: false,
            user_data: None,
            app_path: None,
        }
    }

    #[test]
    fn test_import_set_deduplicates() {
        let mut imports = ImportSet::new();
        imports.insert(CdkModule::Ec2);
        imports.insert(CdkModule::Rds);
        imports.insert(CdkModule::Ec2);

        assert_eq!(imports.len(), 2);
        let all: Vec<_> = imports.lines().collect();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0], "import aws_cdk as cdk");
        assert_eq!(all[3], "from aws_cdk import aws_ec2 as ec2");
    }

    #[test]
    fn test_port_descriptions() {
        assert_eq!(port_description(22), "SSH");
        assert_eq!(port_description(80), "Web Server");
        assert_eq!(port_description(3306), "MySQL");
        assert_eq!(port_description(5432), "Postgres");
        assert_eq!(port_description(8080), "Unknown");
    }

    #[test]
    fn test_private_compute_has_no_output() {
        let mut writer = FileWriter::new();
        Element::Compute(compute()).emit_source(&mut writer);
        let lines = lines(writer);

        assert_eq!(lines[0], "a2_sg = ec2.SecurityGroup(self, 'web1-SecurityGroup', vpc=a1)");
        assert!(lines.iter().any(|l| l.contains(
            "machine_image=ec2.AmazonLinuxImage(generation=ec2.AmazonLinuxGeneration.AMAZON_LINUX_2),"
        )));
        assert!(lines.iter().any(|l| l.contains("SubnetType.PRIVATE_WITH_EGRESS")));
        assert!(!lines.iter().any(|l| l.contains("CfnOutput")));
    }

    #[test]
    fn test_compute_bundles_app_before_user_data() {
        let element = Element::Compute(ComputeElement {
            is_public: true,
            app_path: Some("./app.zip".to_string()),
            user_data: Some("echo hi\\nreboot".to_string()),
            ..compute()
        });

        let mut imports = ImportSet::new();
        element.emit_imports(&mut imports);
        assert!(imports.contains(CdkModule::S3Assets));

        let mut writer = FileWriter::new();
        element.emit_source(&mut writer);
        let lines = lines(writer);

        let position = |needle: &str| lines.iter().position(|l| l.contains(needle)).unwrap();
        assert!(position("s3assets.Asset(self, 'web1 Asset', path='./app.zip')") < position("add_user_data"));
        assert!(position("unzip app.zip") < position("add_user_data"));
        assert!(position("add_user_data('echo hi\\nreboot')") < position("CfnOutput"));
        assert!(lines.contains(&"a2.user_data.add_commands(f'cp {a2_filepath} app.zip')".to_string()));
    }

    #[test]
    fn test_private_database_omits_subnet() {
        let element = Element::Database(DatabaseElement {
            id: "d".to_string(),
            variable_name: "a3".to_string(),
            resource_name: "db1".to_string(),
            vpc: vpc_ref(),
            instance_type: "t3.micro".to_string(),
            engine: DatabaseEngine::Postgres,
            is_public: false,
            database_name: "hermes-x-db1".to_string(),
        });
        let mut writer = FileWriter::new();
        element.emit_source(&mut writer);
        let text = writer.into_text();

        assert!(text.contains("engine=rds.DatabaseInstanceEngine.POSTGRES,"));
        assert!(text.contains("from_generated_secret('postgres_user')"));
        assert!(text.contains("allocated_storage=10,"));
        assert!(!text.contains("vpc_subnets"));
    }

    #[test]
    fn test_website_bucket_with_deployment() {
        let element = Element::Bucket(BucketElement {
            id: "s".to_string(),
            variable_name: "a1".to_string(),
            resource_name: "site1".to_string(),
            website: Some(WebsiteDocuments {
                index: "index.html".to_string(),
                error: "error.html".to_string(),
            }),
            app_path: Some("./dist".to_string()),
        });

        let mut imports = ImportSet::new();
        element.emit_imports(&mut imports);
        assert!(imports.contains(CdkModule::S3Deployment));

        let mut writer = FileWriter::new();
        element.emit_source(&mut writer);
        let text = writer.into_text();
        assert!(text.contains("public_read_access=True,"));
        assert!(text.contains("website_index_document='index.html',"));
        assert!(text.contains("sources=[s3_deployment.Source.asset('./dist')],"));
        assert!(text.contains("destination_bucket=a1"));
    }

    #[test]
    fn test_rule_modes() {
        let boundary = SecurityGroupRule {
            id: "c".to_string(),
            source: vpc_ref(),
            target: compute_ref("w", "a2"),
            ports: vec![22, 80],
            protocol: "tcp".to_string(),
        };
        let mut writer = FileWriter::new();
        Element::SecurityGroupRule(boundary).emit_source(&mut writer);
        assert_eq!(
            lines(writer),
            vec![
                "a2_sg.add_ingress_rule(ec2.Peer.any_ipv4(), ec2.Port.tcp(22), 'SSH')",
                "a2_sg.add_ingress_rule(ec2.Peer.any_ipv4(), ec2.Port.tcp(80), 'Web Server')",
            ]
        );

        let peer = SecurityGroupRule {
            id: "c".to_string(),
            source: compute_ref("w", "a2"),
            target: compute_ref("x", "a3"),
            ports: vec![5432],
            protocol: "tcp".to_string(),
        };
        let mut writer = FileWriter::new();
        Element::SecurityGroupRule(peer).emit_source(&mut writer);
        assert_eq!(
            lines(writer),
            vec![
                "a2_sg.connections.allow_from(ec2.Connections(security_groups=[a3_sg]), ec2.Port.tcp(5432), 'Postgres')"
            ]
        );
    }
}
