use crate::model::DependencyRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_issues: usize,
    pub critical_issues: usize,
    pub pr_created: bool,
    pub pr_url: Option<String>,
}

/// The rendered report plus the numbers behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub content: String,
    pub summary: ReportSummary,
    pub dependencies: Vec<DependencyRecord>,
}

impl Report {
    /// Records a published pull request. The rendered content is left untouched
    /// since it was already used as the pull request body.
    pub fn attach_pull_request(&mut self, pr_url: Option<String>) {
        self.summary.pr_created = true;
        self.summary.pr_url = pr_url;
    }
}

/// Renders the markdown report. Pure: identical input, identical output.
pub fn generate_report(dependencies: &[DependencyRecord], pr_url: Option<&str>) -> Report {
    let critical = dependencies.iter().filter(|d| d.risk.is_critical()).count();

    let mut content = String::from("# Dependency Doctor Report\n\n");
    content.push_str(&format!(
        "## 📦 Dependencies to update ({} issues)\n\n",
        dependencies.len()
    ));

    if dependencies.is_empty() {
        content.push_str("No outdated dependencies found.\n");
    } else {
        content.push_str("| Package | Current Version | Target Version | Risk | Recommendation |\n");
        content.push_str("|---------|-----------------|----------------|------|----------------|\n");
        for dep in dependencies {
            content.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                escape_cell(&dep.name),
                escape_cell(&dep.current),
                escape_cell(&dep.wanted),
                dep.risk,
                escape_cell(&dep.recommendation)
            ));
        }
    }

    content.push_str("\n## 📊 Summary\n");
    content.push_str(&format!("- **Total issues**: {}\n", dependencies.len()));
    content.push_str(&format!("- **Critical issues**: {critical}\n"));
    match pr_url {
        Some(url) => content.push_str(&format!("- **Pull Request**: [Link]({url})\n")),
        None => content.push_str("- **Pull Request**: None\n"),
    }
    content.push_str("\n## 🔧 Next Steps\n");
    content.push_str("- Review dependencies with **critical/high** risk.\n");
    content.push_str("- Run `npm test` after any updates.\n");

    Report {
        content,
        summary: ReportSummary {
            total_issues: dependencies.len(),
            critical_issues: critical,
            pr_created: pr_url.is_some(),
            pr_url: pr_url.map(str::to_string),
        },
        dependencies: dependencies.to_vec(),
    }
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}
