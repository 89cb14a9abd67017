//! Prompt templates for each task kind

use log::trace;

use crate::TaskKind;

/// Turns user input into the prompt sent to the model
pub trait PromptBuilder: Send + Sync
{   fn build(
      &self
    , text: &str
    , task: TaskKind
    , source_lang: &str
    , target_lang: &str
    ) -> String;
}

/// Display name of a language code, if known
pub fn language_name(code: &str) -> Option<&'static str>
{   match code
    {   "zh" => Some("Chinese")
      , "en" => Some("English")
      , "ja" => Some("Japanese")
      , "ko" => Some("Korean")
      , "fr" => Some("French")
      , "de" => Some("German")
      , "es" => Some("Spanish")
      , "ru" => Some("Russian")
      , _ => None
    }
}

/// Customs-domain prompts: a translation instruction for terminology,
/// an expert preamble for the other tasks
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomsPromptBuilder;

impl CustomsPromptBuilder
{   fn preamble(task: TaskKind) -> &'static str
    {   match task
        {   TaskKind::Classification => {
              "As a customs commodity classification expert, assign an HS \
               code to the following goods and explain the reasoning:"
            }
          , TaskKind::Valuation => {
              "As a customs valuation expert, analyse the value of the \
               following goods and give reasonable advice:"
            }
          , TaskKind::CustomsConsulting => {
              "As a customs business consultant, give a professional \
               answer and advice on the following question:"
            }
          , TaskKind::Terminology => "Please answer the following question:"
        }
    }

    fn translation_instruction(source: &str, target: &str) -> String
    {   format!(
          "You are a professional translator. Translate the following \
           {source} text into {target}.\n\n\
           Requirements:\n\
           1. Output only the {target} translation\n\
           2. Do not repeat the {source} original\n\
           3. Do not add explanations or notes\n\
           4. Keep the translation accurate and natural\n\n\
           {source} text to translate:"
        )
    }
}

impl PromptBuilder for CustomsPromptBuilder
{   fn build(
      &self
    , text: &str
    , task: TaskKind
    , source_lang: &str
    , target_lang: &str
    ) -> String
    {   let mut prompt = if task.is_translation()
        {   let source = language_name(source_lang).unwrap_or("Chinese");
            let target = language_name(target_lang).unwrap_or("English");
            Self::translation_instruction(source, target)
        } else
        {   Self::preamble(task).to_string()
        };

        if !text.is_empty()
        {   prompt.push('\n');
            prompt.push_str(text);
        }
        trace!("Built {} prompt: {}", task, prompt);
        prompt
    }
}
