//! Reply texts for each turn outcome and resource-type detection on oracle replies.

use intake_core::domain::resource::ResourceType;
use intake_core::domain::session::{PrConflict, ResourceCounts};
use intake_core::intake::validator::requirements;
use intake_core::intake::{ParseError, ValidationError};

pub const NOTHING_COLLECTED: &str =
    "We haven't collected any resources yet! What would you like to create?";

pub const TITLE_TOO_SHORT: &str = "Please provide a descriptive PR title (at least 3 words).\n\
                                   Example: 'Add sales analytics resources for LATAM'";

pub const CONFLICT_OPTIONS: &str = "Please choose an option:\n\n\
     **Option 1:** Type **'add to existing'** or **'1'**\n\
     → Your changes will be added to the current PR\n\n\
     **Option 2:** Type **'close and create new'** or **'2'**\n\
     → I'll close the old PR and create a fresh one";

pub fn welcome() -> String {
    "👋 Hey there! I'm your MIW Data Platform Assistant!\n\n\
     I help you create automated Pull Requests for:\n\
     ✨ **Glue Databases**\n\
     ✨ **S3 Buckets**\n\
     ✨ **IAM Roles**\n\n\
     What would you like to create today?"
        .to_string()
}

pub fn resource_accepted(resource_type: ResourceType, name: &str) -> String {
    format!(
        "✅ Perfect! I've got your {} '{name}'.\n\n\
         Want to add more resources to this PR?\n\
         • Another Glue Database\n\
         • An S3 Bucket\n\
         • An IAM Role\n\n\
         Or type **'done'** to create the PR! 🚀",
        resource_type.display_name()
    )
}

pub fn validation_failed(error: &ValidationError) -> String {
    let mut reply = format!("❌ **Validation Failed**\n\n{error}");
    if error.resource_type == ResourceType::GlueDb {
        reply.push_str("\n\n💡 Type 'validation help' to see all requirements.");
    }
    reply
}

pub fn parse_failed(error: &ParseError) -> String {
    format!("❌ Validation error: {error}\n\nPlease check your input.")
}

pub fn validation_help(current: Option<ResourceType>) -> String {
    let body = match current {
        Some(resource_type) => requirements(resource_type),
        None => ResourceType::ALL.into_iter().map(requirements).collect::<Vec<_>>().join("\n\n"),
    };
    format!("📋 **Validation Requirements**\n\n{body}")
}

pub fn ask_for_title(counts: ResourceCounts) -> String {
    format!(
        "Awesome! Here's what we're packaging:\n\
         📦 {} Glue DB(s)\n\
         📦 {} S3 Bucket(s)\n\
         📦 {} IAM Role(s)\n\n\
         What should the PR title be?\n\
         (Example: 'Add sales analytics resources for LATAM')",
        counts.glue_dbs, counts.s3_buckets, counts.iam_roles
    )
}

pub fn pr_created(title: &str, url: &str, counts: ResourceCounts) -> String {
    format!(
        "🎉 **SUCCESS!** Your PR is live!\n\n\
         📋 **Title:** {title}\n\
         🔗 **PR Link:** {url}\n\
         📦 **Included:** {} Glue DB(s), {} S3 Bucket(s), {} IAM Role(s)\n\n\
         ✅ Session reset! Want to create another PR?",
        counts.glue_dbs, counts.s3_buckets, counts.iam_roles
    )
}

pub fn pr_conflict(conflict: &PrConflict) -> String {
    let number = conflict.pr_number;
    format!(
        "⚠️ **Hold on! A PR already exists!**\n\n\
         📋 **Existing PR:** {}\n\
         🔗 **URL:** {}\n\
         🔢 **Number:** #{number}\n\n\
         ✅ **Good news:** Your changes are already committed and pushed!\n\n\
         📦 **What's ready to add:**\n\
         • {} Glue Database(s)\n\
         • {} S3 Bucket(s)\n\
         • {} IAM Role(s)\n\n\
         **What would you like to do?**\n\n\
         **Option 1:** Type **'add to existing'** or **'1'**\n\
         → Add your new resources to the existing PR #{number}\n\n\
         **Option 2:** Type **'close and create new'** or **'2'**\n\
         → Close PR #{number} and create a fresh PR with your resources\n\n\
         Choose wisely! 🤔",
        conflict.pr_title, conflict.pr_url, conflict.glue_count, conflict.s3_count,
        conflict.iam_count
    )
}

pub fn appended(conflict: &PrConflict, comment_posted: bool) -> String {
    let number = conflict.pr_number;
    if !comment_posted {
        return format!(
            "✅ **Changes are in the existing PR!**\n\n\
             Your resources have been committed and will appear in PR #{number}.\n\n\
             🔗 {}\n\n\
             (Note: Couldn't add comment, but your changes are there!)\n\n\
             Ready for more? 🚀",
            conflict.pr_url
        );
    }
    format!(
        "✅ **Perfect! Changes added to existing PR!**\n\n\
         📦 **What was added:**\n\
         • {} Glue Database(s)\n\
         • {} S3 Bucket(s)\n\
         • {} IAM Role(s)\n\n\
         🔗 **View PR:** {}\n\n\
         Your changes are now in PR #{number}. I've added a comment to notify the reviewers!\n\n\
         Ready to create more resources? 🚀",
        conflict.glue_count, conflict.s3_count, conflict.iam_count, conflict.pr_url
    )
}

pub fn replaced(closed: u64, url: &str, counts: ResourceCounts) -> String {
    format!(
        "🎉 **Success! Old PR closed, new PR created!**\n\n\
         🔒 **Closed:** PR #{closed}\n\
         ✨ **New PR:** {url}\n\n\
         📦 **Included:**\n\
         • {} Glue Database(s)\n\
         • {} S3 Bucket(s)\n\
         • {} IAM Role(s)\n\n\
         Your fresh PR is ready for review! Want to create more? 🚀",
        counts.glue_dbs, counts.s3_buckets, counts.iam_roles
    )
}

pub fn close_failed(error: &impl std::fmt::Display) -> String {
    format!("❌ Failed to close PR: {error}\n\nTry closing it manually on GitHub.")
}

pub fn replacement_failed(reason: &str) -> String {
    format!("❌ Closed old PR but failed to create new one: {reason}")
}

pub fn delivery_failed(error: &impl std::fmt::Display) -> String {
    format!("❌ Error: {error}\n\n🔄 Session reset. Try again?")
}

/// Resource type the oracle's reply is talking about, if any. Glue wins over
/// S3, S3 over IAM.
pub fn detect_resource_type(reply: &str) -> Option<ResourceType> {
    let lower = reply.to_lowercase();
    if lower.contains("glue") && (lower.contains("database") || lower.contains("db")) {
        Some(ResourceType::GlueDb)
    } else if lower.contains("s3") && lower.contains("bucket") {
        Some(ResourceType::S3Bucket)
    } else if lower.contains("iam") && lower.contains("role") {
        Some(ResourceType::IamRole)
    } else {
        None
    }
}
