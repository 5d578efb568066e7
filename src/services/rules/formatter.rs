//! Rule Formatting
//!
//! Renders a rule forest as markdown for the synthesis prompt.

use std::collections::BTreeMap;

use game_advisor_core::GameRule;

/// Group top-level rules by category (alphabetical) and render each as an
/// indented bullet tree. Rules keep their load order within a category and
/// children stay under their parent whatever their own category.
///
/// ```text
/// ### Combat
/// - Learn the attack pattern
///   - Roll through the sweep
/// ```
pub fn format_rules(rules: &[GameRule]) -> String {
    if rules.is_empty() {
        return String::new();
    }

    let mut by_category: BTreeMap<&str, Vec<&GameRule>> = BTreeMap::new();
    for rule in rules {
        let category = match rule.category.trim() {
            "" => "General",
            c => c,
        };
        by_category.entry(category).or_default().push(rule);
    }

    let mut output = String::new();
    for (i, (category, rules)) in by_category.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(&format!("### {}\n", category));
        for rule in rules {
            render_rule(rule, 0, &mut output);
        }
    }
    output
}

fn render_rule(rule: &GameRule, depth: usize, output: &mut String) {
    let text = rule.rule_text.split_whitespace().collect::<Vec<_>>().join(" ");
    output.push_str(&"  ".repeat(depth));
    output.push_str("- ");
    output.push_str(&text);
    output.push('\n');
    for child in &rule.children {
        render_rule(child, depth + 1, output);
    }
}
