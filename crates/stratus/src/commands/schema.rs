use colored::Colorize;
use stratus_cloud::{AttributeKind, AttributeSpec, Presence, ResourceDescriptor};

pub fn handle(type_name: Option<&str>) -> anyhow::Result<()> {
    let resources = stratus_cloud_otc::resource_schemas();
    let data_sources = stratus_cloud_otc::data_source_schemas();

    let Some(type_name) = type_name else {
        println!("{}", "Resources:".bold());
        for descriptor in &resources {
            println!("  {}", descriptor.name().cyan());
        }
        println!("{}", "Data sources:".bold());
        for descriptor in &data_sources {
            println!("  {}", descriptor.name().cyan());
        }
        return Ok(());
    };

    let mut found = false;
    for (label, descriptor) in resources
        .iter()
        .map(|d| ("resource", d))
        .chain(data_sources.iter().map(|d| ("data source", d)))
        .filter(|(_, d)| d.name() == type_name)
    {
        found = true;
        print_descriptor(label, descriptor);
    }

    if !found {
        anyhow::bail!("Unknown type: {}", type_name);
    }
    Ok(())
}

fn print_descriptor(label: &str, descriptor: &ResourceDescriptor) {
    println!("{} ({})", descriptor.name().cyan().bold(), label);
    for spec in descriptor.attributes() {
        print_attribute(spec, 1);
    }
    println!();
}

fn print_attribute(spec: &AttributeSpec, depth: usize) {
    let indent = "  ".repeat(depth);
    let mut flags = vec![presence_label(spec.presence)];
    if spec.force_new {
        flags.push("force-new");
    }
    println!(
        "{}{} {} [{}]",
        indent,
        spec.name,
        kind_label(&spec.kind).dimmed(),
        flags.join(", ")
    );

    let nested = match &spec.kind {
        AttributeKind::Block(fields) => Some(fields),
        AttributeKind::List(item) => match item.as_ref() {
            AttributeKind::Block(fields) => Some(fields),
            _ => None,
        },
        _ => None,
    };
    for field in nested.into_iter().flatten() {
        print_attribute(field, depth + 1);
    }
}

fn presence_label(presence: Presence) -> &'static str {
    match presence {
        Presence::Required => "required",
        Presence::Optional => "optional",
        Presence::Computed => "computed",
        Presence::OptionalComputed => "optional, computed",
    }
}

fn kind_label(kind: &AttributeKind) -> String {
    match kind {
        AttributeKind::List(item) => format!("list({})", kind_label(item)),
        other => other.name().to_string(),
    }
}
