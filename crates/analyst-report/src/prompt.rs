// Copyright (c) 2026 - present Nicholas D. Crosbie
// SPDX-License-Identifier: MIT

//! Prompt templates
//!
//! Every template fences the artifact in backticks and tells the model to
//! answer `Context Empty` when there is nothing between the fences.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reply the model is asked to give for an empty artifact
pub const EMPTY_CONTEXT_REPLY: &str = "Context Empty";

const TECHNICAL: &str = r#"You are a senior software engineer reviewing the repository "{repo}".
Its content is given below between backtick fences as a sequence of commit
sections ("=== commit <sha> ===") and file sections ("--- <path> ---").
If there is nothing between the fences, reply with exactly "Context Empty".

Analyse the content and write a report in this structure, replacing every
<placeholder> with findings from the code:

## <repository name> Codebase Analysis Report

**1. Repository Activity**
* Commits: <volume and nature of the commits shown>
* Contributors: <who is active and on what>

**2. Code Quality and Best Practices**
* Strengths: <what is done well>
* Areas for Improvement: <concrete problems, with file names and line numbers>
* Refactoring Suggestions: <duplication, complex functions, inefficient algorithms>
* DRY Principle: <repeated blocks and how to consolidate them>

**3. Recommendations**
* <prioritised, actionable next steps>

Content:
"#;

const STAKEHOLDER: &str = r#"You are a code analysis assistant trusted by both engineers and management.
You will review the repository "{repo}", whose content is given below between
backtick fences as commit sections ("=== commit <sha> ===") and file sections
("--- <path> ---"). If there is nothing between the fences, reply with exactly
"Context Empty".

Assess code quality, maintainability and efficiency, then produce two reports.

1. Technical Report (for developers)
   - Repository metadata: commits and contributors
   - Code quality: strengths and areas for improvement, citing files
   - Refactoring opportunities and adherence to the DRY principle
   - Recommendations

2. Non-Technical Report (for management and stakeholders)
   - Introduction: what was reviewed
   - Overall health: Green, Yellow or Red, with a one-paragraph explanation
   - Development pace and collaboration
   - Actionable insights and next steps, in plain language

Replace every placeholder with real observations from the content.

Content:
"#;

const WEEKLY_DIGEST: &str = r#"You are a software engineer preparing the periodic activity digest for the
repository "{repo}". The changes made during the period are given below between
backtick fences: each commit section ("=== commit <sha> ===") is followed by the
files it changed ("--- <path> ---") and their diffs. If there is nothing between
the fences, reply with exactly "Context Empty".

Write a digest that covers:
1. Summary of the period: what was worked on and by whom
2. Notable changes, grouped by area of the codebase
3. Code quality observations on the changed code, including duplication and
   refactoring opportunities, citing files
4. Risks or follow-ups a reviewer should look at
5. A short non-technical summary for stakeholders

Changes:
"#;

/// Which report to ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromptTemplate {
    /// Structured codebase analysis for developers
    #[default]
    Technical,
    /// Technical plus non-technical report
    Stakeholder,
    /// Review of the commits in a period, used for scheduled email
    WeeklyDigest,
}

impl PromptTemplate {
    /// All templates, in display order
    pub const ALL: [PromptTemplate; 3] = [
        PromptTemplate::Technical,
        PromptTemplate::Stakeholder,
        PromptTemplate::WeeklyDigest,
    ];

    fn instructions(self) -> &'static str {
        match self {
            PromptTemplate::Technical => TECHNICAL,
            PromptTemplate::Stakeholder => STAKEHOLDER,
            PromptTemplate::WeeklyDigest => WEEKLY_DIGEST,
        }
    }

    /// Build the full prompt for `repo_name` around `artifact_text`
    ///
    /// The fence is made longer than any backtick run inside the artifact so
    /// that embedded code blocks cannot close it early.
    #[must_use]
    pub fn render(self, repo_name: &str, artifact_text: &str) -> String {
        let fence = "`".repeat(fence_len(artifact_text));
        let instructions = self.instructions().replace("{repo}", repo_name);

        let mut prompt =
            String::with_capacity(instructions.len() + artifact_text.len() + 2 * fence.len() + 4);
        prompt.push_str(&instructions);
        prompt.push_str(&fence);
        prompt.push('\n');
        prompt.push_str(artifact_text);
        if !artifact_text.is_empty() && !artifact_text.ends_with('\n') {
            prompt.push('\n');
        }
        prompt.push_str(&fence);
        prompt.push('\n');
        prompt
    }
}

fn fence_len(text: &str) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    (longest + 1).max(3)
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PromptTemplate::Technical => "technical",
            PromptTemplate::Stakeholder => "stakeholder",
            PromptTemplate::WeeklyDigest => "weekly-digest",
        })
    }
}

impl FromStr for PromptTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PromptTemplate::ALL
            .into_iter()
            .find(|t| t.to_string() == s)
            .ok_or_else(|| format!("unknown template: {s}"))
    }
}
