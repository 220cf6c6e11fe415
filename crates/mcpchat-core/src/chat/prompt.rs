//! System prompt assembly

use crate::tools::ResourceInfo;

/// `- name: description` per resource, or a placeholder line
pub fn format_resources(resources: &[ResourceInfo]) -> String {
    if resources.is_empty() {
        return "No resources currently available.".to_string();
    }

    resources
        .iter()
        .map(|r| format!("- {}: {}", r.resource.name, r.resource.description))
        .collect::<Vec<_>>()
        .join("\n")
}

/// System prompt listing the available resources
pub fn system_prompt(resources: &[ResourceInfo]) -> String {
    format!(
        "You are a helpful assistant with access to VoIP/SIP documentation and other tools.

Available Resources:
{}

When users ask about VoIP, SIP, FreeSWITCH, or related topics:
- Use the search_voip_docs tool to find relevant information
- Use get_sip_message_example to show SIP message formats
- Cite specific sources when using documentation

You also have access to weather data if needed.",
        format_resources(resources)
    )
}
