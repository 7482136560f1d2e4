//! Encode command construction

use crate::domain::model::*;

/// Builds the ffmpeg-style argument vector for a plan
#[derive(Debug, Clone)]
pub struct EncodeCommand<'a> {
    plan: &'a EncodePlan,
    threads: usize,
}

impl<'a> EncodeCommand<'a> {
    /// `threads == 0` lets the encoder decide
    pub fn new(plan: &'a EncodePlan, threads: usize) -> Self {
        Self { plan, threads }
    }

    /// Arguments reading `input` and writing `output` in engine working storage
    pub fn build(&self, input: &str, output: &str) -> Vec<String> {
        let plan = self.plan;
        let codec = &plan.codec;
        let mut args: Vec<String> = Vec::with_capacity(48);

        push(&mut args, &["-hide_banner", "-nostdin", "-y", "-i", input]);

        // First video stream plus any audio; source metadata is stripped by policy
        push(
            &mut args,
            &["-map", "0:v:0", "-map", "0:a?", "-map_metadata", "-1", "-map_chapters", "-1"],
        );

        args.push("-vf".to_string());
        args.push(format!("scale={}:{}", plan.output_width, plan.output_height));
        push(&mut args, &["-pix_fmt", "yuv420p", "-c:v", codec.encoder_name]);

        self.push_effort(&mut args);
        self.push_rate_control(&mut args);
        self.push_keyframes(&mut args);

        if codec.codec_id == CodecId::Hevc && codec.is_mp4() {
            push(&mut args, &["-tag:v", "hvc1"]);
        }

        push(&mut args, &["-c:a", codec.audio_encoder]);
        args.push("-b:a".to_string());
        args.push(format!("{}k", codec.audio_bitrate_kbps));

        if codec.is_mp4() {
            push(&mut args, &["-movflags", "+faststart"]);
        }

        args.push("-threads".to_string());
        args.push(self.threads.to_string());
        args.push(output.to_string());
        args
    }

    fn push_effort(&self, args: &mut Vec<String>) {
        match &self.plan.quality_params.effort {
            EncoderEffort::X26x { preset } => push(args, &["-preset", preset]),
            EncoderEffort::Vpx { deadline, cpu_used } => {
                push(args, &["-deadline", deadline]);
                args.push("-cpu-used".to_string());
                args.push(cpu_used.to_string());
                push(args, &["-row-mt", "1"]);
            }
        }
    }

    fn push_rate_control(&self, args: &mut Vec<String>) {
        match &self.plan.quality_params.rate_control {
            RateControl::ConstantQuality { crf } => {
                args.push("-crf".to_string());
                args.push(crf.to_string());
                // libvpx only honors CRF as constant quality with a zero bitrate
                if self.plan.codec.codec_id == CodecId::Vp9 {
                    push(args, &["-b:v", "0"]);
                }
            }
            RateControl::Bitrate {
                target_kbps,
                max_kbps,
                buffer_kbps,
            } => {
                args.push("-b:v".to_string());
                args.push(format!("{}k", target_kbps));
                args.push("-maxrate".to_string());
                args.push(format!("{}k", max_kbps));
                args.push("-bufsize".to_string());
                args.push(format!("{}k", buffer_kbps));
            }
        }
    }

    fn push_keyframes(&self, args: &mut Vec<String>) {
        let keyframes = self.plan.quality_params.keyframes;
        match self.plan.codec.codec_id {
            CodecId::Hevc => {
                args.push("-x265-params".to_string());
                args.push(format!(
                    "keyint={}:min-keyint={}:scenecut={}:log-level=error",
                    keyframes.gop_size,
                    keyframes.min_keyint,
                    if keyframes.scene_cut_detection { 40 } else { 0 }
                ));
            }
            CodecId::H264 => {
                args.push("-g".to_string());
                args.push(keyframes.gop_size.to_string());
                args.push("-keyint_min".to_string());
                args.push(keyframes.min_keyint.to_string());
                if !keyframes.scene_cut_detection {
                    push(args, &["-sc_threshold", "0"]);
                }
            }
            CodecId::Vp9 => {
                args.push("-g".to_string());
                args.push(keyframes.gop_size.to_string());
                args.push("-keyint_min".to_string());
                args.push(keyframes.min_keyint.to_string());
            }
        }
    }
}

fn push(args: &mut Vec<String>, values: &[&str]) {
    args.extend(values.iter().map(|v| v.to_string()));
}
