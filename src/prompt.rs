use crate::analysis::Language;

pub const SYSTEM_MESSAGE: &str =
    "You are a helpful medical AI assistant that provides health report analysis and recommendations.";

const SECTIONS: &str = "\
1. **SUMMARY**: A comprehensive summary of the test results
2. **KEY FINDINGS**: Important findings and abnormal values
3. **HEALTH STATUS**: Overall health assessment
4. **LIFESTYLE RECOMMENDATIONS**: Specific lifestyle changes needed
5. **DIETARY SUGGESTIONS**: Nutritional recommendations
6. **EXERCISE RECOMMENDATIONS**: Physical activity suggestions
7. **FOLLOW-UP ACTIONS**: When to consult doctors or repeat tests
8. **PREVENTIVE MEASURES**: Steps to prevent future health issues";

pub fn build_prompt(report_text: &str, language: Language) -> String {
    let instruction = language.instruction();
    let mut result = String::with_capacity(report_text.len() + SECTIONS.len() + instruction.len() + 400);
    result.push_str("You are a medical AI assistant specializing in health report analysis.\n");
    result.push_str("Please analyze the following health checkup report and provide:\n\n");
    result.push_str(SECTIONS);
    result.push_str("\n\n");
    result.push_str(instruction);
    result.push_str("\n\nHealth Report Text:\n");
    result.push_str(report_text);
    result.push_str("\n\nPlease provide a detailed, structured analysis that's easy to understand for a non-medical person.\n");
    result.push_str("Include specific actionable recommendations.");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::SECTION_KEYWORDS;

    #[test]
    fn prompt_names_every_section_in_order() {
        let prompt = build_prompt("Hb 13", Language::English);
        let mut cursor = 0;
        for (keyword, _) in SECTION_KEYWORDS {
            let found = prompt[cursor..].find(keyword).expect(keyword);
            cursor += found + keyword.len();
        }
    }

    #[test]
    fn prompt_embeds_text_and_language_instruction() {
        let prompt = build_prompt("Glucose 180 mg/dL", Language::Hinglish);
        assert!(prompt.contains("Health Report Text:\nGlucose 180 mg/dL"));
        assert!(prompt.contains(Language::Hinglish.instruction()));
        assert!(!prompt.contains(Language::English.instruction()));
    }
}
