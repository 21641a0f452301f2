pub const WORD_PLACEHOLDER: &str = "{word}";
pub const SENTENCE_PLACEHOLDER: &str = "{sentence}";

/// Fill the first `{word}` and the first `{sentence}` of `template`.
///
/// Later repeats of a placeholder stay as written. Substituted values are
/// never scanned for placeholders. An empty sentence falls back to the
/// selected text.
pub fn build_prompt(template: &str, word: &str, sentence: &str) -> String {
    let sentence = if sentence.trim().is_empty() {
        word
    } else {
        sentence
    };
    substitute(template, word, sentence, false)
}

/// Fill every `{word}` and `{sentence}` of `template`, as used when a stored
/// entry is explained again with a custom prompt.
pub fn build_prompt_all(template: &str, word: &str, sentence: &str) -> String {
    substitute(template, word, sentence, true)
}

fn substitute(template: &str, word: &str, sentence: &str, every: bool) -> String {
    let mut out = String::with_capacity(template.len() + word.len() + sentence.len());
    let mut word_left = true;
    let mut sentence_left = true;
    let mut rest = template;
    while let Some(brace) = rest.find('{') {
        out.push_str(&rest[..brace]);
        let tail = &rest[brace..];
        match (
            tail.strip_prefix(WORD_PLACEHOLDER),
            tail.strip_prefix(SENTENCE_PLACEHOLDER),
        ) {
            (Some(after), _) if word_left => {
                out.push_str(word);
                word_left = every;
                rest = after;
            }
            (_, Some(after)) if sentence_left => {
                out.push_str(sentence);
                sentence_left = every;
                rest = after;
            }
            _ => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Built-in prompt for a UI locale such as `"ru"` or `"en-US"`; English otherwise.
pub fn default_prompt(locale: &str) -> &'static str {
    let language = locale
        .split(|c: char| matches!(c, '-' | '_' | '.'))
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match language.as_str() {
        "ru" => DEFAULT_PROMPT_RU,
        "th" => DEFAULT_PROMPT_TH,
        _ => DEFAULT_PROMPT_EN,
    }
}

pub const DEFAULT_PROMPT_EN: &str = r#"Give the transcription of the word "{word}" from the sentence "{sentence}" and translate the sentence into English.
Make the word **bold** in the translated text.

Example:
```
**rápido** /ˈrapido/ fast, rapid
The train is very **fast** and will arrive soon.
```

without wrapping "```""#;

pub const DEFAULT_PROMPT_RU: &str = r#"Give the transcription of the word "{word}" from the sentence "{sentence}" and translate the sentence into Russian.
And make the word **bold** in the translated text.

Example:
```
**vaguely** /ˈveɪɡli/ - смутно, расплывчато
Модсли повернул голову, **смутно** посмотрел в сторону Кармоди, затем вернулся к разговору.
```

without wrapping "```""#;

pub const DEFAULT_PROMPT_TH: &str = r#"Give the transcription of the word "{word}" from the sentence "{sentence}" and translate the sentence into Thai.
And make the word **bold** in the translated text.

Example:
```
**squelched** [skwɛltʃt] - เหยียบอย่างเปียกแฉะ, เดินลุยน้ำ
เขา**ย่ำเท้าอย่างเปียกแฉะ**ข้ามพื้นผิวที่ชื้นของแท่นข้ามมิติ พยายามไม่คิดว่ามีอะไรซึมออกมาระหว่างนิ้วเท้าของเขา.
```

without wrapping "```""#;
