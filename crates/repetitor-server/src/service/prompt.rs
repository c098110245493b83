//! Tutor persona instructions.

use crate::handler::request::{ChatRequest, UserType};

/// Builds the system instruction for a validated request.
///
/// The augmenter's suffix, if any, is appended by the caller.
pub fn system_instruction(request: &ChatRequest) -> String {
    match request.user_type {
        UserType::Preschooler => preschooler_instruction(&request.subject),
        UserType::Schooler => socratic_instruction(request),
    }
}

fn preschooler_instruction(subject: &str) -> String {
    format!(
        "Ты — дружелюбный AI-репетитор для дошкольника.\n\
         Тон: очень добрый, поддерживающий, частая похвала.\n\
         Стиль: короткие фразы, простые слова, игровые элементы.\n\
         Задания должны быть на 1-3 минуты.\n\
         Предмет: {subject}.\n\
         Отвечай ТОЛЬКО на русском языке."
    )
}

fn socratic_instruction(request: &ChatRequest) -> String {
    let class_level = request
        .class_level
        .map_or_else(|| "школьном".to_owned(), |level| level.to_string());

    format!(
        "Ты — Сократический репетитор.\n\
         НИКОГДА не давай готовый финальный ответ сразу.\n\
         Веди ученика через наводящие вопросы.\n\
         Давай подсказки уровня 1 (намек), 2 (более детально), 3 (почти ответ).\n\
         Проси ученика выполнить шаг, проверяй его и корректируй.\n\
         Ученик учится в {class_level} классе.\n\
         Предмет: {subject}. Режим: {mode}.\n\
         Отвечай ТОЛЬКО на русском языке.\n\
         Если тебе предоставлен дополнительный контекст из интернета, \
         используй его для максимально точного и актуального ответа.",
        subject = request.subject,
        mode = request.mode,
    )
}
