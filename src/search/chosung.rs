// Chosung (Hangul initial consonant) module for the search gateway
// Detects consonant-only shorthand queries such as "ㅅㅁㅌㅍ"

/// First consonant in the Hangul Compatibility Jamo block (ㄱ)
const JAMO_CONSONANT_FIRST: char = '\u{3131}';
/// Last consonant in the Hangul Compatibility Jamo block (ㅎ)
const JAMO_CONSONANT_LAST: char = '\u{314E}';

const SYLLABLE_FIRST: u32 = 0xAC00;
const SYLLABLE_LAST: u32 = 0xD7A3;
/// Syllables sharing one initial consonant (21 vowels x 28 finals)
const SYLLABLES_PER_INITIAL: u32 = 21 * 28;

/// Initial consonants in syllable order, as compatibility jamo
const INITIALS: [char; 19] = [
    'ㄱ', 'ㄲ', 'ㄴ', 'ㄷ', 'ㄸ', 'ㄹ', 'ㅁ', 'ㅂ', 'ㅃ', 'ㅅ',
    'ㅆ', 'ㅇ', 'ㅈ', 'ㅉ', 'ㅊ', 'ㅋ', 'ㅌ', 'ㅍ', 'ㅎ',
];

/// True when every non-whitespace character is a compatibility jamo consonant.
/// Empty or blank input is not chosung.
pub fn is_initial_consonant_only(text: &str) -> bool {
    let mut seen = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            continue;
        }
        if !(JAMO_CONSONANT_FIRST..=JAMO_CONSONANT_LAST).contains(&ch) {
            return false;
        }
        seen = true;
    }
    seen
}

/// Replace each precomposed Hangul syllable by its initial consonant.
/// Other characters are kept as they are.
pub fn initial_consonants(text: &str) -> String {
    text.chars()
        .map(|ch| {
            let code = ch as u32;
            if (SYLLABLE_FIRST..=SYLLABLE_LAST).contains(&code) {
                INITIALS[((code - SYLLABLE_FIRST) / SYLLABLES_PER_INITIAL) as usize]
            } else {
                ch
            }
        })
        .collect()
}
