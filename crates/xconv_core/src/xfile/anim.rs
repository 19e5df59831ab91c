//! `AnimationSet` sub-grammar.
//!
//! Runs as its own small state machine over the shared line source once the
//! main parser sees an `AnimationSet` header. Every key record becomes one
//! single-keyframe [`Animation`].

use super::lexer::{Line, LineSource};
use super::parser::{expect_line, parse_numbers, skip_block, unexpected, BlockHeader, ParseError, ParseResult};
use crate::animation::{Animation, AnimationClip, AnimationOptions, AnimationSet, ChannelKind, Keyframe};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AnimState {
    /// Inside the set, between `Animation` blocks
    AnimationSet,
    /// Inside an `Animation` block: bone reference, options and keys
    Animation,
    /// Expecting the channel code of an `AnimationKey`
    Key,
    KeyCount {
        kind: ChannelKind,
    },
    KeyData {
        kind: ChannelKind,
        declared: usize,
        seen: usize,
    },
    Finished,
}

impl AnimState {
    fn block(self) -> &'static str {
        match self {
            AnimState::AnimationSet | AnimState::Finished => "AnimationSet",
            AnimState::Animation => "Animation",
            AnimState::Key | AnimState::KeyCount { .. } | AnimState::KeyData { .. } => "AnimationKey",
        }
    }
}

/// Clip being read; the bone may appear before or after its keys.
struct PendingClip {
    clip: AnimationClip,
    bone: Option<String>,
    keys: Vec<(ChannelKind, Keyframe)>,
    line: usize,
}

impl PendingClip {
    fn finish(self) -> ParseResult<AnimationClip> {
        let Some(bone) = self.bone else {
            return Err(ParseError::Unexpected {
                line: self.line,
                block: "Animation",
                expected: "a `{bone}` reference",
                found: self.clip.name,
            });
        };

        let mut clip = self.clip;
        clip.bone = Some(bone.clone());
        clip.animations = self
            .keys
            .into_iter()
            .map(|(kind, key)| Animation {
                kind,
                bone: bone.clone(),
                keyframes: vec![key],
            })
            .collect();
        Ok(clip)
    }
}

/// Parse an `AnimationSet` block whose header line was already taken.
pub(super) fn parse_animation_set(source: &mut LineSource, start: &Line, name: &str) -> ParseResult<AnimationSet> {
    let mut set = AnimationSet::new(name);
    let mut pending: Option<PendingClip> = None;
    let mut state = AnimState::AnimationSet;

    while state != AnimState::Finished {
        let Some(line) = source.next_line() else {
            return Err(ParseError::UnexpectedEof {
                line: start.number,
                block: state.block(),
            });
        };

        state = match state {
            AnimState::AnimationSet => {
                if line.text == "}" {
                    AnimState::Finished
                } else {
                    match BlockHeader::parse(&line.text) {
                        Some(header) if header.keyword == "Animation" => {
                            pending = Some(PendingClip {
                                clip: AnimationClip::new(header.name),
                                bone: None,
                                keys: Vec::new(),
                                line: line.number,
                            });
                            AnimState::Animation
                        }
                        Some(_) => {
                            skip_block(source, &line)?;
                            AnimState::AnimationSet
                        }
                        None => return Err(unexpected(&line, "AnimationSet", "an Animation block or `}`")),
                    }
                }
            }
            AnimState::Animation => {
                let Some(clip) = pending.as_mut() else {
                    return Err(unexpected(&line, "Animation", "an Animation block"));
                };
                animation_line(source, clip, &line)?
            }
            AnimState::Key => {
                let code = parse_code(&line, "AnimationKey")?;
                let kind = ChannelKind::from_code(code)
                    .ok_or_else(|| unexpected(&line, "AnimationKey", "key type 0, 1 or 2"))?;
                AnimState::KeyCount { kind }
            }
            AnimState::KeyCount { kind } => {
                let declared = parse_code(&line, "AnimationKey")? as usize;
                AnimState::KeyData {
                    kind,
                    declared,
                    seen: 0,
                }
            }
            AnimState::KeyData { kind, declared, seen } => {
                if line.text == "}" {
                    if seen != declared {
                        return Err(ParseError::Unexpected {
                            line: line.number,
                            block: "AnimationKey",
                            expected: "as many keys as declared",
                            found: format!("{} of {} keys", seen, declared),
                        });
                    }
                    AnimState::Animation
                } else {
                    let key = parse_key(&line, kind)?;
                    if let Some(clip) = pending.as_mut() {
                        clip.keys.push((kind, key));
                    }
                    AnimState::KeyData {
                        kind,
                        declared,
                        seen: seen + 1,
                    }
                }
            }
            AnimState::Finished => AnimState::Finished,
        };

        // Closing an Animation block hands the clip to the set
        if state == AnimState::AnimationSet {
            if let Some(clip) = pending.take() {
                set.clips.push(clip.finish()?);
            }
        }
    }

    Ok(set)
}

/// One line inside an `Animation` block.
fn animation_line(source: &mut LineSource, clip: &mut PendingClip, line: &Line) -> ParseResult<AnimState> {
    if line.text == "}" {
        return Ok(AnimState::AnimationSet);
    }

    let Some(header) = BlockHeader::parse(&line.text) else {
        return Err(unexpected(line, "Animation", "a bone reference, AnimationOptions or AnimationKey"));
    };

    match header.keyword {
        // `{bone}`
        "" if header.body.is_some() => {
            let bone = header.body.unwrap_or_default().trim();
            clip.bone = Some(bone.to_string());
            Ok(AnimState::Animation)
        }
        "AnimationKey" => Ok(AnimState::Key),
        "AnimationOptions" => {
            let body = match header.body {
                Some(body) => body.to_string(),
                None => {
                    let mut parts = Vec::new();
                    loop {
                        let next = expect_line(source, line, "AnimationOptions")?;
                        if next.text == "}" {
                            break;
                        }
                        parts.push(next.text);
                    }
                    parts.join(" ")
                }
            };
            clip.clip.options = Some(parse_options(&body, line)?);
            Ok(AnimState::Animation)
        }
        _ => {
            skip_block(source, line)?;
            Ok(AnimState::Animation)
        }
    }
}

/// `openclosed; positionquality;` - an open animation plays once.
fn parse_options(body: &str, line: &Line) -> ParseResult<AnimationOptions> {
    let values: Vec<u32> = body
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>().map_err(|_| ParseError::InvalidNumber {
                line: line.number,
                block: "AnimationOptions",
                text: s.to_string(),
            })
        })
        .collect::<ParseResult<_>>()?;

    let Some(&open_closed) = values.first() else {
        return Err(unexpected(line, "AnimationOptions", "the open/closed flag"));
    };
    Ok(AnimationOptions {
        play_once: open_closed == 0,
        position_quality: values.get(1).copied().unwrap_or(0),
    })
}

/// `12;` -> 12
fn parse_code(line: &Line, block: &'static str) -> ParseResult<u32> {
    let text = line.text.trim_end_matches(';').trim();
    text.parse::<u32>().map_err(|_| ParseError::InvalidNumber {
        line: line.number,
        block,
        text: text.to_string(),
    })
}

/// `frame;dim;v0,v1,...;;,`
fn parse_key(line: &Line, kind: ChannelKind) -> ParseResult<Keyframe> {
    let record = line.text.trim_end_matches([',', ';']);
    let mut fields = record.splitn(3, ';');
    let (Some(frame), Some(dim), Some(values)) = (fields.next(), fields.next(), fields.next()) else {
        return Err(unexpected(line, "AnimationKey", "a key record like `0;3;0.0,0.0,0.0;;,`"));
    };

    let invalid = |s: &str| ParseError::InvalidNumber {
        line: line.number,
        block: "AnimationKey",
        text: s.trim().to_string(),
    };
    let frame = frame.trim().parse::<u32>().map_err(|_| invalid(frame))?;
    let dim = dim.trim().parse::<usize>().map_err(|_| invalid(dim))?;

    if dim != kind.dimension() {
        return Err(ParseError::Unexpected {
            line: line.number,
            block: "AnimationKey",
            expected: "a key dimension matching the key type",
            found: format!("{} values for a {:?} key", dim, kind),
        });
    }

    let values = parse_numbers(values, line, "AnimationKey")?;
    if values.len() != dim {
        return Err(unexpected(line, "AnimationKey", "as many values as the key dimension"));
    }
    Ok(Keyframe { frame, dim, values })
}
