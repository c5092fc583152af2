//! Prompt builders for puzzle generation and answer verification.

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::llm::ChatMessage;
use crate::state::puzzle::{Difficulty, Language, Puzzle, PuzzleContent};

/// Sampling temperature for puzzle generation; high to favor novelty.
pub const GENERATION_TEMPERATURE: f32 = 1.1;
/// Sampling temperature for answer verification; low to favor determinism.
pub const VERIFICATION_TEMPERATURE: f32 = 0.1;
/// Completion budget for puzzle generation.
pub const GENERATION_MAX_TOKENS: u32 = 2000;
/// Completion budget for answer verification.
pub const VERIFICATION_MAX_TOKENS: u32 = 500;

/// Theme hints rotated into the user prompt to bias lexical diversity.
const THEMES_EN: &[&str] = &[
    "nature", "technology", "daily life", "emotions", "food", "travel", "science", "culture",
    "weather", "sports",
];
const THEMES_ZH: &[&str] = &[
    "自然", "科技", "日常生活", "情感", "饮食", "旅行", "科学", "人文", "天气", "运动",
];

const GENERATE_SYSTEM_ZH: &str = "你是一个中文词语专家，擅长创建字词接龙游戏。

你的任务是生成一个字词接龙题目，包含三个汉字(字A, 字B, 答案)，要求根据pattern类型组合:

**Pattern 1 (A+答案, 答案+B)**: 字A+答案=词语1，答案+字B=词语2，答案在中间位置
**Pattern 2 (答案+A, B+答案)**: 答案+字A=词语1，字B+答案=词语2，答案在左右两边
**Pattern 3 (A+答案, B+答案)**: 字A+答案=词语1，字B+答案=词语2，答案在右侧

所有词语都应该是常见的、有意义的词。答案汉字必须不同于字A和字B。

难度等级说明 (按教育阶段划分):
- easy (小学水平): 小学1-6年级常见词语，日常生活用语
- medium (初中水平): 初中7-9年级词汇，包括基础成语和常用词组合
- hard (高中水平): 高中10-12年级高级词汇、常见文言文词语、较深成语
- professional (大学水平): 大学常见词汇、高级成语、较深文化词语

词汇选择原则: 符合对应教育阶段的认知水平，避免生僻字和晦涩术语，保持词汇多样性。

请以JSON格式返回:
{
    \"char1\": \"第一个字\",
    \"char2\": \"第二个字\",
    \"answer\": \"正确答案\",
    \"word1\": \"第一个词语\",
    \"word2\": \"第二个词语\",
    \"pattern\": 1,
    \"explanation\": \"简短解释\"
}

重要: 只返回JSON，不要包含任何其他文字。";

const GENERATE_SYSTEM_EN: &str = "You are an expert in English word associations and Remote Associates Test (RAT) puzzle design.

Your task is to generate a word association puzzle with 4 words (Word A, B, C, and Answer D), where:
1. A + D forms a valid compound word or common phrase
2. B + D forms a valid compound word or common phrase
3. C + D forms a valid compound word or common phrase

Words A, B, and C must be three different words, and the answer must differ from all of them.

Difficulty levels (by education stage):
- easy (Elementary School): common everyday words familiar to K-6 students
- medium (Middle School): grade 7-9 vocabulary including common idioms
- hard (High School): grade 10-12 advanced vocabulary and expressions
- professional (University): college-level vocabulary and sophisticated expressions

Word selection principles: match the cognitive level of the education stage, avoid obscure or arcane words, and keep the vocabulary diverse across topics.

Return in JSON format:
{
    \"word1\": \"First word\",
    \"word2\": \"Second word\",
    \"word3\": \"Third word\",
    \"answer\": \"The connecting word\",
    \"phrase1\": \"word1 + answer compound/phrase\",
    \"phrase2\": \"word2 + answer compound/phrase\",
    \"phrase3\": \"word3 + answer compound/phrase\",
    \"explanation\": \"Brief explanation\"
}

Important: Return ONLY the JSON, no other text.";

/// Build the conversation requesting one fresh puzzle. The structural
/// pattern (Chinese mode) and theme hint are chosen at random per call so
/// consecutive generations drift across the lexicon.
pub fn generation_messages(difficulty: Difficulty, language: Language) -> Vec<ChatMessage> {
    let mut rng = rand::rng();
    match language {
        Language::Zh => {
            let pattern: u8 = rng.random_range(1..=3);
            let theme = THEMES_ZH.choose(&mut rng).copied().unwrap_or("日常生活");
            vec![
                ChatMessage::system(GENERATE_SYSTEM_ZH),
                ChatMessage::user(format!(
                    "请生成一个{}难度的中文字词接龙题目，使用Pattern {pattern}。主题偏向「{theme}」。记住要确保词汇多样性。",
                    difficulty.as_str()
                )),
            ]
        }
        Language::En => {
            let theme = THEMES_EN.choose(&mut rng).copied().unwrap_or("daily life");
            vec![
                ChatMessage::system(GENERATE_SYSTEM_EN),
                ChatMessage::user(format!(
                    "Generate a {} difficulty English word association puzzle leaning on the theme of {theme}. Remember to ensure vocabulary diversity.",
                    difficulty.as_str()
                )),
            ]
        }
    }
}

/// Build the conversation asking whether a non-exact user answer is an
/// equally valid solution to the puzzle.
pub fn verification_messages(puzzle: &Puzzle, user_answer: &str) -> Vec<ChatMessage> {
    let canonical = puzzle.content.answer();
    let prompt = match &puzzle.content {
        PuzzleContent::Char(content) => format!(
            "给定一个字词接龙题目和用户的答案，判断答案是否正确。\n\n题目:\n- 字1: {}\n- 字2: {}\n- 标准答案: {}\n- 用户答案: {}\n\n判断规则:\n1. 如果用户答案与标准答案完全相同，返回正确\n2. 如果 字1+用户答案 和 用户答案+字2 都能组成有效词语（与标准答案不同但同样合理），也返回正确\n3. 否则返回错误\n\n请以JSON格式返回:\n{{\n    \"correct\": true/false,\n    \"reason\": \"判断理由（简短说明）\"\n}}\n\n只返回JSON，不要其他文字。",
            content.char1, content.char2, canonical, user_answer
        ),
        PuzzleContent::Word(content) => format!(
            "Given a word association puzzle and a user's answer, determine if the answer is correct.\n\nPuzzle:\n- Word 1: {}\n- Word 2: {}\n- Word 3: {}\n- Correct Answer: {}\n- User Answer: {}\n\nJudgment rules:\n1. If the user's answer exactly matches the correct answer, return correct\n2. If the user's answer forms valid compound words/phrases with all three words (different from the standard answer but equally valid), also return correct\n3. Otherwise, return incorrect\n\nReturn in JSON format:\n{{\n    \"correct\": true/false,\n    \"reason\": \"Brief explanation of the judgment\"\n}}\n\nReturn ONLY the JSON, no other text.",
            content.word1, content.word2, content.word3, canonical, user_answer
        ),
    };

    vec![ChatMessage::user(prompt)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::puzzle::{PuzzleOrigin, samples};

    #[test]
    fn zh_generation_prompt_names_a_pattern() {
        let messages = generation_messages(Difficulty::Medium, Language::Zh);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.contains("Pattern"));
        assert!(messages[1].content.contains("medium"));
    }

    #[test]
    fn verification_prompt_embeds_inputs_and_answers() {
        let puzzle = Puzzle::new(
            Difficulty::Easy,
            PuzzleOrigin::Generated,
            samples::word_content(["sun", "moon", "candle"], "light"),
        );
        let messages = verification_messages(&puzzle, "beam");
        assert_eq!(messages.len(), 1);
        let prompt = &messages[0].content;
        assert!(prompt.contains("sun"));
        assert!(prompt.contains("light"));
        assert!(prompt.contains("beam"));
    }
}
