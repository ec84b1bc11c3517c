//! 起始输入校验：宿主在开启对话前调用

/// 最短输入长度（字符）
pub const MIN_INPUT_LENGTH: usize = 3;
/// 最长输入长度（字符）
pub const MAX_INPUT_LENGTH: usize = 2000;

/// 修剪首尾空白并把内部连续空白压成单个空格
pub fn sanitize_input(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 校验起始输入，返回 Err(提示语) 供宿主展示
pub fn validate_user_input(text: &str) -> Result<(), String> {
    if text.is_empty() {
        return Err("Please enter a question or topic to start the dialogue.".to_string());
    }
    let chars = text.chars().count();
    if chars < MIN_INPUT_LENGTH {
        return Err(format!(
            "Input is too short (minimum {} characters).",
            MIN_INPUT_LENGTH
        ));
    }
    if chars > MAX_INPUT_LENGTH {
        return Err(format!(
            "Input is too long (maximum {} characters).",
            MAX_INPUT_LENGTH
        ));
    }
    Ok(())
}
